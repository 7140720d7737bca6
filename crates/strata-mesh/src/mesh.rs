//! Source mesh representation: identity, vertex/triangle buffers, and
//! derived-attribute recomputation (normals, tangents, bounds).

use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Vec2, Vec3, Vec4};

use crate::aabb::Aabb;

/// Stable identity of a source mesh, used as the LOD cache key.
///
/// Two entities sharing the same `MeshId` share one generated LOD profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

impl MeshId {
    /// Allocate a fresh process-unique identity.
    ///
    /// Hosts that already track asset identities may construct `MeshId`
    /// directly from their own handles instead.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Triangle mesh data: positions, a triangle index list, and optional
/// per-vertex normals, UVs, and tangents.
///
/// The position buffer is the authoritative vertex set. Simplification only
/// ever shrinks the index list; vertices are never re-indexed or compacted,
/// so indices stay valid across detail levels.
#[derive(Clone, Debug)]
pub struct MeshData {
    /// Debug name. Derived levels append a deterministic suffix.
    pub name: String,
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Triangle index list. Each triple indexes into `positions`.
    pub indices: Vec<[u32; 3]>,
    /// Per-vertex normals. Empty means absent.
    pub normals: Vec<Vec3>,
    /// Per-vertex texture coordinates. Empty means absent.
    pub uvs: Vec<Vec2>,
    /// Per-vertex tangents (xyz) with handedness in w. Empty means absent.
    pub tangents: Vec<Vec4>,
    /// Bounding volume, kept in sync by [`MeshData::recompute_bounds`].
    pub bounds: Aabb,
}

impl MeshData {
    /// Create a mesh from positions and triangles, computing bounds.
    /// Normals, UVs, and tangents start absent.
    #[must_use]
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        let bounds = Aabb::from_points(&positions);
        Self {
            name: name.into(),
            positions,
            indices,
            normals: Vec::new(),
            uvs: Vec::new(),
            tangents: Vec::new(),
            bounds,
        }
    }

    /// Number of triangles in the index list.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns the triangle's corner positions, or `None` if any index is
    /// out of range of the position buffer.
    #[must_use]
    pub fn triangle_positions(&self, tri: [u32; 3]) -> Option<[Vec3; 3]> {
        let a = self.positions.get(tri[0] as usize)?;
        let b = self.positions.get(tri[1] as usize)?;
        let c = self.positions.get(tri[2] as usize)?;
        Some([*a, *b, *c])
    }

    /// Geometric normal of a triangle (unnormalized cross product).
    /// The magnitude is twice the triangle area, which makes accumulating
    /// these area-weighted by construction.
    #[must_use]
    pub fn face_normal_raw(&self, tri: [u32; 3]) -> Option<Vec3> {
        let [a, b, c] = self.triangle_positions(tri)?;
        Some((b - a).cross(c - a))
    }

    /// Recompute per-vertex normals by area-weighted face-normal
    /// accumulation. Triangles with out-of-range indices are skipped.
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.positions.len()];
        for &tri in &self.indices {
            let Some(n) = self.face_normal_raw(tri) else {
                continue;
            };
            for &i in &tri {
                if let Some(slot) = accum.get_mut(i as usize) {
                    *slot += n;
                }
            }
        }
        self.normals = accum
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
            .collect();
    }

    /// Recompute the bounding volume from the position buffer.
    pub fn recompute_bounds(&mut self) {
        self.bounds = Aabb::from_points(&self.positions);
    }

    /// Recompute per-vertex tangents from UV gradients.
    ///
    /// A no-op when UVs are absent or the UV buffer does not cover the
    /// vertex buffer. Requires normals; call
    /// [`MeshData::recompute_normals`] first if they are stale.
    pub fn recompute_tangents(&mut self) {
        if self.uvs.len() < self.positions.len() || self.normals.len() < self.positions.len() {
            self.tangents.clear();
            return;
        }
        let mut tan = vec![Vec3::ZERO; self.positions.len()];
        let mut bitan = vec![Vec3::ZERO; self.positions.len()];
        for &tri in &self.indices {
            let Some([p0, p1, p2]) = self.triangle_positions(tri) else {
                continue;
            };
            let (uv0, uv1, uv2) = (
                self.uvs[tri[0] as usize],
                self.uvs[tri[1] as usize],
                self.uvs[tri[2] as usize],
            );
            let (e1, e2) = (p1 - p0, p2 - p0);
            let (d1, d2) = (uv1 - uv0, uv2 - uv0);
            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let b = (e2 * d1.x - e1 * d2.x) * r;
            for &i in &tri {
                tan[i as usize] += t;
                bitan[i as usize] += b;
            }
        }
        self.tangents = (0..self.positions.len())
            .map(|i| {
                let n = self.normals[i];
                // Gram-Schmidt orthogonalize against the normal.
                let t = (tan[i] - n * n.dot(tan[i]))
                    .try_normalize()
                    .unwrap_or(Vec3::X);
                let w = if n.cross(t).dot(bitan[i]) < 0.0 {
                    -1.0
                } else {
                    1.0
                };
                t.extend(w)
            })
            .collect();
    }
}
