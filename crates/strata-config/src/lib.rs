//! Configuration system for the Strata LOD layer.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap and forward/backward compatible
//! serialization (unknown fields ignored, missing fields defaulted).

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, LodConfig, ScheduleConfig};
pub use error::ConfigError;
