//! Distance-to-level selection policy.
//!
//! Two equivalent encodings: a linear partition of `[0, max_distance]` into
//! equal bands, and an explicit non-decreasing threshold table. Thresholds
//! generated from a linear schedule select the same levels as the linear
//! encoding, so profiles may carry either.

use tracing::trace;

/// How distance maps to a discrete level index.
#[derive(Clone, Debug, PartialEq)]
pub enum LevelSchedule {
    /// Equal bands: `level = floor(min(d, max) / max * level_count)`,
    /// clamped to `[0, level_count]`. Beyond `max_distance` the
    /// most-reduced level is selected.
    Linear {
        /// Distance at which the most-reduced level becomes active.
        max_distance: f32,
        /// Number of reduced levels beyond level 0.
        level_count: usize,
    },
    /// Explicit per-level activation distances, index 0 (full detail)
    /// upward. Selects the highest index whose threshold the distance
    /// reaches, defaulting to 0.
    Thresholds(Vec<f32>),
}

/// Maps a continuous distance to a discrete detail level.
///
/// Selection is hysteresis-free: the level is recomputed from scratch each
/// cycle, so a distance oscillating exactly on a threshold boundary can
/// oscillate between adjacent levels. That is a known, accepted limitation
/// of this policy rather than a bug to fix silently.
#[derive(Clone, Debug)]
pub struct LodPolicy {
    schedule: LevelSchedule,
    /// Multiplies effective distance before thresholding. Bias > 1 selects
    /// reduced levels earlier (more aggressive reduction).
    bias: f32,
}

impl LodPolicy {
    /// Linear partition policy.
    ///
    /// # Panics
    ///
    /// Panics if `max_distance` is not positive, `level_count` is zero, or
    /// `bias` is not positive.
    #[must_use]
    pub fn linear(max_distance: f32, level_count: usize, bias: f32) -> Self {
        assert!(max_distance > 0.0, "max_distance must be positive");
        assert!(level_count > 0, "level_count must be at least 1");
        assert!(bias > 0.0, "bias must be positive");
        Self {
            schedule: LevelSchedule::Linear {
                max_distance,
                level_count,
            },
            bias,
        }
    }

    /// Threshold-table policy. `thresholds[i]` is the distance at which
    /// level `i` becomes active; `thresholds[0]` is normally 0.
    ///
    /// # Panics
    ///
    /// Panics if the table is empty, contains a negative distance, or is
    /// not non-decreasing, or if `bias` is not positive.
    #[must_use]
    pub fn with_thresholds(thresholds: Vec<f32>, bias: f32) -> Self {
        assert!(!thresholds.is_empty(), "must have at least one threshold");
        assert!(bias > 0.0, "bias must be positive");
        for (i, &t) in thresholds.iter().enumerate() {
            assert!(t >= 0.0, "thresholds must be non-negative");
            if i > 0 {
                assert!(
                    t >= thresholds[i - 1],
                    "thresholds must be non-decreasing"
                );
            }
        }
        Self {
            schedule: LevelSchedule::Thresholds(thresholds),
            bias,
        }
    }

    /// Index of the most-reduced level.
    #[must_use]
    pub fn max_level(&self) -> usize {
        match &self.schedule {
            LevelSchedule::Linear { level_count, .. } => *level_count,
            LevelSchedule::Thresholds(t) => t.len() - 1,
        }
    }

    /// The configured bias.
    #[must_use]
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Select the detail level for an entity at `distance` from the
    /// observation point. 0 = full detail, `max_level()` = most reduced.
    #[must_use]
    pub fn select_level(&self, distance: f32) -> usize {
        debug_assert!(distance >= 0.0, "distance must be non-negative");
        let effective = distance * self.bias;
        let level = match &self.schedule {
            LevelSchedule::Linear {
                max_distance,
                level_count,
            } => {
                let normalized = effective.min(*max_distance) / max_distance;
                ((normalized * *level_count as f32).floor() as usize).min(*level_count)
            }
            LevelSchedule::Thresholds(thresholds) => thresholds
                .iter()
                .rposition(|&t| effective >= t)
                .unwrap_or(0),
        };
        trace!(distance, effective, level, "selected detail level");
        level
    }

    /// The raw (unbiased) distance at which `level` becomes active; used to
    /// stamp generated profiles. Returns the last threshold for levels past
    /// the end of the schedule.
    #[must_use]
    pub fn activation_distance(&self, level: usize) -> f32 {
        match &self.schedule {
            LevelSchedule::Linear {
                max_distance,
                level_count,
            } => {
                let level = level.min(*level_count);
                (level as f32 / *level_count as f32) * max_distance / self.bias
            }
            LevelSchedule::Thresholds(t) => t[level.min(t.len() - 1)] / self.bias,
        }
    }
}
