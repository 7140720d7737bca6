//! Structured logging for the Strata LOD layer.
//!
//! Provides structured, filterable logging via the `tracing` ecosystem:
//! console output with timestamps and module paths, environment-based
//! filtering (respects `RUST_LOG`), and integration with the configuration
//! system's `log_level` setting.

use strata_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Filter precedence: `RUST_LOG` environment variable, then the config's
/// `debug.log_level`, then `"info"`. Safe to call more than once — later
/// calls are no-ops, which lets tests initialize logging unconditionally.
pub fn init_logging(config: Option<&Config>) {
    let filter_str = match config {
        Some(config) if !config.debug.log_level.is_empty() => config.debug.log_level.clone(),
        _ => "info".to_string(),
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new("info")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_info() {
        let filter = default_env_filter();
        assert!(format!("{filter}").contains("info"));
    }

    #[test]
    fn test_config_level_parses_as_filter() {
        let mut config = Config::default();
        config.debug.log_level = "strata_lod=debug".to_string();
        let filter = EnvFilter::new(&config.debug.log_level);
        assert!(format!("{filter}").contains("strata_lod=debug"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(None);
        init_logging(None);
    }
}
