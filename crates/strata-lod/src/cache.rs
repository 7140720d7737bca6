//! Per-mesh-identity cache of generated LOD profiles.
//!
//! The cache is the single point preventing duplicate simplification work
//! when many entities share one source mesh: the first request generates
//! the profile, every later request gets the stored `Arc`. The cache takes
//! `&mut self`, so single-writer draining per cycle makes first-use
//! generation at-most-once without per-key locks.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use strata_materials::MaterialDesc;
use strata_mesh::{MeshData, MeshId, SimplifyStrategy, simplify};

use crate::error::LodError;
use crate::policy::LodPolicy;
use crate::profile::{LevelRepresentation, LodProfile};

/// Parameters controlling profile generation.
#[derive(Clone, Debug)]
pub struct ProfileParams {
    /// Reduction ratio of the most-reduced level, in `[0, 1)`. Level `i`
    /// of `n` uses ratio `i / n * max_reduction_ratio`.
    pub max_reduction_ratio: f32,
    /// Triangle-removal strategy passed to the simplifier.
    pub strategy: SimplifyStrategy,
    /// Generate a scaled-texture material variant per level. When false,
    /// every level aliases the source material.
    pub scale_textures: bool,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            max_reduction_ratio: 0.9,
            strategy: SimplifyStrategy::Truncate,
            scale_textures: true,
        }
    }
}

/// Maps source mesh identity to its generated [`LodProfile`].
///
/// Entries persist until [`ProfileCache::clear`]; clearing drops the
/// cache's `Arc`s, while entities still holding a profile keep their levels
/// alive until their own teardown.
#[derive(Default)]
pub struct ProfileCache {
    profiles: FxHashMap<MeshId, Arc<LodProfile>>,
    simplify_invocations: u64,
}

impl ProfileCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the profile for `id`, generating it on first use.
    ///
    /// Generation calls the simplifier once per non-zero level; a cache hit
    /// never re-invokes it and returns the identical `Arc`.
    ///
    /// # Errors
    ///
    /// [`LodError::EmptyMesh`] when the source has no triangles.
    pub fn get_or_create(
        &mut self,
        id: MeshId,
        source: &Arc<MeshData>,
        material: Option<&Arc<MaterialDesc>>,
        policy: &LodPolicy,
        params: &ProfileParams,
    ) -> Result<Arc<LodProfile>, LodError> {
        if let Some(profile) = self.profiles.get(&id) {
            debug!(mesh_id = id.0, "profile cache hit");
            return Ok(Arc::clone(profile));
        }

        if source.triangle_count() == 0 {
            return Err(LodError::EmptyMesh(source.name.clone()));
        }

        let level_count = policy.max_level();
        let mut levels = Vec::with_capacity(level_count + 1);
        levels.push(LevelRepresentation {
            mesh: Arc::clone(source),
            material: material.map(Arc::clone),
            triangle_count: source.triangle_count(),
            threshold: policy.activation_distance(0),
        });

        for i in 1..=level_count {
            let ratio = (i as f32 / level_count as f32) * params.max_reduction_ratio;
            let mesh = Arc::new(simplify(source, ratio, &params.strategy));
            self.simplify_invocations += 1;
            let level_material = material.map(|mat| {
                if params.scale_textures {
                    // Unreadable textures fall back to unscaled pixels
                    // inside `scaled`; the level still gets a material.
                    Arc::new(mat.scaled(1.0 - ratio))
                } else {
                    Arc::clone(mat)
                }
            });
            levels.push(LevelRepresentation {
                triangle_count: mesh.triangle_count(),
                mesh,
                material: level_material,
                threshold: policy.activation_distance(i),
            });
        }

        let profile = Arc::new(LodProfile::new(levels));
        info!(
            mesh = %source.name,
            mesh_id = id.0,
            levels = profile.len(),
            "generated LOD profile"
        );
        self.profiles.insert(id, Arc::clone(&profile));
        Ok(profile)
    }

    /// Whether a profile exists for `id`.
    #[must_use]
    pub fn contains(&self, id: MeshId) -> bool {
        self.profiles.contains_key(&id)
    }

    /// Number of cached profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Total simplifier invocations since construction, for tests and
    /// telemetry.
    #[must_use]
    pub fn simplify_invocations(&self) -> u64 {
        self.simplify_invocations
    }

    /// Drop all cached profiles. Levels still referenced by live entities
    /// stay alive through their `Arc`s and are released on entity teardown.
    pub fn clear(&mut self) {
        self.profiles.clear();
    }
}
