//! Triangle-reduction strategies for LOD mesh generation.
//!
//! Two interchangeable strategies produce a reduced mesh from a source mesh:
//! plain index-order truncation, and importance-ranked retention that keeps
//! triangles on sharp silhouette/crease edges preferentially. Neither ever
//! re-indexes the vertex buffer; only the triangle index list shrinks.

use std::cmp::Ordering;

use glam::Vec3;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::mesh::MeshData;

/// Reference direction for the edge sharpness heuristic.
const REFERENCE_UP: Vec3 = Vec3::Y;

/// How triangles are chosen for removal during simplification.
#[derive(Clone, Debug, PartialEq)]
pub enum SimplifyStrategy {
    /// Keep the first triangles in index order, drop the rest.
    ///
    /// O(1) beyond the copy. No quality guarantee: acceptable for
    /// axis-uniform or procedurally-ordered meshes, poor when geometric
    /// importance is uncorrelated with index order.
    Truncate,
    /// Rank triangles by edge sharpness and drop the least important first,
    /// preserving sharp creases over flat interior geometry.
    ///
    /// Sharpness of an edge is the maximum over its incident faces of
    /// `(1 - |dot(face_normal, up)|) * edge_threshold`. This is a heuristic
    /// estimate of geometric prominence, not a true dihedral-angle measure.
    EdgePreserving {
        /// Scale applied to the per-face sharpness term.
        edge_threshold: f32,
    },
}

impl Default for SimplifyStrategy {
    fn default() -> Self {
        Self::Truncate
    }
}

/// Target triangle count for a reduction ratio:
/// `max(1, floor(original * (1 - ratio)))`.
#[must_use]
pub fn target_triangle_count(original: usize, ratio: f32) -> usize {
    ((original as f64) * (1.0 - f64::from(ratio))).floor().max(1.0) as usize
}

/// Produce a reduced-triangle mesh from `source`.
///
/// `ratio` is the fraction of triangles to remove, clamped to `[0, 1)`.
/// The output keeps the full source vertex buffer; normals are recomputed
/// only when the source normal buffer does not cover the vertex buffer,
/// then bounds and tangents are refreshed. The output name is derived
/// deterministically from the source name and ratio for debuggability.
///
/// A source with no usable triangles yields a degenerate single-triangle
/// mesh rather than an error; that floor exists so downstream swaps always
/// have something to point at, not as a meaningful render output.
#[must_use]
pub fn simplify(source: &MeshData, ratio: f32, strategy: &SimplifyStrategy) -> MeshData {
    let ratio = if (0.0..1.0).contains(&ratio) {
        ratio
    } else {
        warn!(
            mesh = %source.name,
            ratio,
            "reduction ratio outside [0, 1), clamping"
        );
        ratio.clamp(0.0, 1.0 - f32::EPSILON)
    };

    let vertex_count = source.positions.len();
    let valid: Vec<[u32; 3]> = source
        .indices
        .iter()
        .copied()
        .filter(|tri| tri.iter().all(|&i| (i as usize) < vertex_count))
        .collect();
    let skipped = source.indices.len() - valid.len();
    if skipped > 0 {
        debug!(
            mesh = %source.name,
            skipped,
            "skipped triangles with out-of-range vertex indices"
        );
    }

    let mut out = MeshData {
        name: derived_name(&source.name, ratio),
        positions: source.positions.clone(),
        indices: Vec::new(),
        normals: source.normals.clone(),
        uvs: source.uvs.clone(),
        tangents: source.tangents.clone(),
        bounds: source.bounds,
    };

    if valid.is_empty() {
        warn!(mesh = %source.name, "no usable triangles, emitting degenerate output");
        if out.positions.is_empty() {
            out.positions.push(Vec3::ZERO);
        }
        out.indices.push([0, 0, 0]);
    } else {
        let target = target_triangle_count(source.triangle_count(), ratio).min(valid.len());
        out.indices = match strategy {
            SimplifyStrategy::Truncate => valid[..target].to_vec(),
            SimplifyStrategy::EdgePreserving { edge_threshold } => {
                retain_by_importance(source, &valid, target, *edge_threshold)
            }
        };
    }

    if out.normals.len() != out.positions.len() {
        out.recompute_normals();
    }
    out.recompute_bounds();
    out.recompute_tangents();
    out
}

/// Deterministic name for a derived level, e.g. `"rock.lod30"` at ratio 0.3.
fn derived_name(source_name: &str, ratio: f32) -> String {
    format!("{source_name}.lod{:02}", (ratio * 100.0).round() as u32)
}

/// Canonical undirected edge key: smaller vertex index first.
fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Retain the `target` most-important triangles, dropping the least
/// important first. Retained triangles keep their original relative order.
fn retain_by_importance(
    source: &MeshData,
    valid: &[[u32; 3]],
    target: usize,
    edge_threshold: f32,
) -> Vec<[u32; 3]> {
    // Pass 1: per-edge sharpness, the maximum ever recorded across the
    // edge's incident faces.
    let mut edge_sharpness: FxHashMap<(u32, u32), f32> = FxHashMap::default();
    for &tri in valid {
        let normal = source
            .face_normal_raw(tri)
            .and_then(|n| n.try_normalize())
            .unwrap_or(REFERENCE_UP);
        let sharpness = (1.0 - normal.dot(REFERENCE_UP).abs()) * edge_threshold;
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let score = edge_sharpness.entry(edge_key(a, b)).or_insert(0.0);
            if sharpness > *score {
                *score = sharpness;
            }
        }
    }

    // Pass 2: triangle importance = mean of its three edge scores.
    let importance: Vec<f32> = valid
        .iter()
        .map(|tri| {
            let sum: f32 = [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])]
                .into_iter()
                .map(|(a, b)| edge_sharpness.get(&edge_key(a, b)).copied().unwrap_or(0.0))
                .sum();
            sum / 3.0
        })
        .collect();

    // Rank descending by importance, ties broken by original index so the
    // result is deterministic, then restore original triangle order.
    let mut order: Vec<usize> = (0..valid.len()).collect();
    order.sort_by(|&a, &b| {
        importance[b]
            .partial_cmp(&importance[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    let mut keep: Vec<usize> = order.into_iter().take(target).collect();
    keep.sort_unstable();
    keep.into_iter().map(|i| valid[i]).collect()
}
