//! Logging setup
//!
//! Logs go to stderr through `tracing`. The level comes from the `-v`/`-q`
//! flags unless `RUST_LOG` is set, in which case it wins.

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level for this crate
    pub level: Level,

    /// JSON lines instead of text
    pub use_json: bool,

    /// Include the module target in logs
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    /// Maps `-v` / `-q` flags to a configuration
    ///
    /// No flag is INFO, `-v` DEBUG, `-vv` and more TRACE; `-q` is WARN.
    pub fn from_flags(verbose: u8, quiet: bool, use_json: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        };

        Self {
            level,
            use_json,
            include_target: verbose > 1,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("paasify={}", self.level)))
    }
}

/// Initializes the tracing subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.filter();

        if config.use_json {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target),
                )
                .try_init();
        } else {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .without_time(),
                )
                .try_init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_from_flags() {
        assert_eq!(LoggingConfig::from_flags(0, false, false).level, Level::INFO);
        assert_eq!(LoggingConfig::from_flags(1, false, false).level, Level::DEBUG);
        assert_eq!(LoggingConfig::from_flags(3, false, false).level, Level::TRACE);
        assert_eq!(LoggingConfig::from_flags(2, true, false).level, Level::WARN);
    }

    #[test]
    fn json_flag_is_kept() {
        let config = LoggingConfig::from_flags(0, false, true);
        assert!(config.use_json);
        assert!(!config.include_target);
    }

    #[test]
    fn default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
    }
}
