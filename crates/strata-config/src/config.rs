//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level LOD layer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Level-selection and mesh-reduction settings.
    pub lod: LodConfig,
    /// Scheduler cadence and batching settings.
    pub schedule: ScheduleConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Level-selection and mesh-reduction configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Number of reduced levels beyond level 0 (full detail).
    pub level_count: usize,
    /// Distance at which the most-reduced level becomes active.
    pub max_distance: f32,
    /// Reduction ratio of the most-reduced level, in `[0, 1)`.
    pub max_reduction_ratio: f32,
    /// Distance bias (higher = more aggressive LOD reduction).
    pub bias: f32,
    /// Use importance-ranked retention instead of plain truncation.
    pub edge_preserving: bool,
    /// Scale applied to the edge sharpness term in edge-preserving mode.
    pub edge_threshold: f32,
    /// Generate scaled-texture material variants per level.
    pub scale_textures: bool,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minimum milliseconds between update cycles.
    pub update_interval_ms: u64,
    /// Maximum entities evaluated per cycle.
    pub max_objects_per_cycle: usize,
    /// Squared observer movement below which a cycle is skipped.
    pub move_epsilon_sq: f32,
    /// Run the distance/level pass on a background thread.
    pub background_compute: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log per-cycle statistics at info instead of debug.
    pub log_cycle_stats: bool,
}

// --- Default implementations ---

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            level_count: 4,
            max_distance: 100.0,
            max_reduction_ratio: 0.9,
            bias: 1.0,
            edge_preserving: false,
            edge_threshold: 1.0,
            scale_textures: true,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 250,
            max_objects_per_cycle: 64,
            move_epsilon_sq: 0.1,
            background_compute: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_cycle_stats: false,
        }
    }
}

// --- Load / Save / Validate ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config.validated())
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Clamp all values to their legal ranges.
    ///
    /// Out-of-range values from hand-edited files are clamped rather than
    /// rejected: `level_count >= 1`, ratios in `[0, 1)`, positive distances
    /// and bias.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.lod.level_count = self.lod.level_count.max(1);
        self.lod.max_distance = self.lod.max_distance.max(f32::EPSILON);
        self.lod.max_reduction_ratio = self.lod.max_reduction_ratio.clamp(0.0, 0.99);
        self.lod.bias = self.lod.bias.max(f32::EPSILON);
        self.lod.edge_threshold = self.lod.edge_threshold.max(0.0);
        self.schedule.max_objects_per_cycle = self.schedule.max_objects_per_cycle.max(1);
        self.schedule.move_epsilon_sq = self.schedule.move_epsilon_sq.max(0.0);
        self
    }
}
