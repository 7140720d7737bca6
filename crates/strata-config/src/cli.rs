//! Command-line argument parsing for the Strata LOD layer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "strata", about = "Strata LOD layer")]
pub struct CliArgs {
    /// Number of reduced detail levels.
    #[arg(long)]
    pub levels: Option<usize>,

    /// Distance of the most-reduced level.
    #[arg(long)]
    pub max_distance: Option<f32>,

    /// Reduction ratio of the most-reduced level, in [0, 1).
    #[arg(long)]
    pub max_reduction: Option<f32>,

    /// Distance bias (> 1 reduces earlier).
    #[arg(long)]
    pub bias: Option<f32>,

    /// Use edge-preserving triangle retention.
    #[arg(long)]
    pub edge_preserving: Option<bool>,

    /// Scheduler update interval in milliseconds.
    #[arg(long)]
    pub update_interval_ms: Option<u64>,

    /// Maximum entities evaluated per cycle.
    #[arg(long)]
    pub batch: Option<usize>,

    /// Run the distance pass on a background thread.
    #[arg(long)]
    pub background: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(levels) = args.levels {
            self.lod.level_count = levels;
        }
        if let Some(d) = args.max_distance {
            self.lod.max_distance = d;
        }
        if let Some(r) = args.max_reduction {
            self.lod.max_reduction_ratio = r;
        }
        if let Some(b) = args.bias {
            self.lod.bias = b;
        }
        if let Some(ep) = args.edge_preserving {
            self.lod.edge_preserving = ep;
        }
        if let Some(ms) = args.update_interval_ms {
            self.schedule.update_interval_ms = ms;
        }
        if let Some(batch) = args.batch {
            self.schedule.max_objects_per_cycle = batch;
        }
        if let Some(bg) = args.background {
            self.schedule.background_compute = bg;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }

    /// Default config directory: `<user config dir>/strata`, falling back
    /// to the current directory when the platform dir is unavailable.
    #[must_use]
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("strata"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
