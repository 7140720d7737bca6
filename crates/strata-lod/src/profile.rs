//! Generated detail-level representations for one source mesh.

use std::sync::Arc;

use strata_materials::MaterialDesc;
use strata_mesh::MeshData;

/// One detail representation of a source mesh.
#[derive(Clone, Debug)]
pub struct LevelRepresentation {
    /// The derived mesh. Level 0 aliases the source mesh `Arc` and is
    /// therefore never independently destroyed; higher levels own meshes
    /// generated by the simplifier.
    pub mesh: Arc<MeshData>,
    /// Material variant for this level (scaled texture), when material
    /// handling is enabled.
    pub material: Option<Arc<MaterialDesc>>,
    /// Triangle count of `mesh`, exposed for telemetry.
    pub triangle_count: usize,
    /// Raw distance at which this level becomes active.
    pub threshold: f32,
}

/// The ordered detail levels for one source mesh, index 0 (full detail)
/// through N (most reduced).
///
/// Shared by every entity using the same source mesh; the cache hands out
/// one `Arc<LodProfile>` per mesh identity.
#[derive(Debug)]
pub struct LodProfile {
    levels: Vec<LevelRepresentation>,
}

impl LodProfile {
    /// Assemble a profile from its levels.
    ///
    /// # Panics
    ///
    /// Panics if `levels` is empty, thresholds are not non-decreasing, or
    /// triangle counts are not non-increasing with the level index. These
    /// are construction bugs in the generator, not runtime conditions.
    #[must_use]
    pub fn new(levels: Vec<LevelRepresentation>) -> Self {
        assert!(!levels.is_empty(), "profile must have at least level 0");
        for pair in levels.windows(2) {
            assert!(
                pair[1].threshold >= pair[0].threshold,
                "level thresholds must be non-decreasing"
            );
            assert!(
                pair[1].triangle_count <= pair[0].triangle_count,
                "triangle counts must be non-increasing"
            );
        }
        Self { levels }
    }

    /// The representation for `level`, or `None` if out of range.
    #[must_use]
    pub fn level(&self, level: usize) -> Option<&LevelRepresentation> {
        self.levels.get(level)
    }

    /// Total number of levels including level 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the profile has no levels. Never true for a constructed
    /// profile; present for API completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Index of the most-reduced level.
    #[must_use]
    pub fn max_level(&self) -> usize {
        self.levels.len() - 1
    }

    /// The full-detail source mesh (level 0).
    #[must_use]
    pub fn source_mesh(&self) -> &Arc<MeshData> {
        &self.levels[0].mesh
    }
}
