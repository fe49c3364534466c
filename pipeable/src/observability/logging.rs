//! Subscriber installation for binaries and tests embedding the engine.

use crate::config::SettingsNode;
use tracing_subscriber::EnvFilter;

/// How log output is filtered and formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `"info"` or `"pipeable=debug"`.
    pub level: String,
    /// Emit one JSON object per line instead of human readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Reads `logging.level` and `logging.format` (`"json"` or `"text"`).
    ///
    /// Missing keys keep their defaults.
    #[must_use]
    pub fn from_settings(settings: &SettingsNode) -> Self {
        let mut config = Self::default();
        if let Some(logging) = settings.child("logging") {
            if let Some(level) = logging.get_str("level") {
                config.level = level.to_string();
            }
            if let Some(format) = logging.get_str("format") {
                config.json = format.eq_ignore_ascii_case("json");
            }
        }
        config
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails if a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let installed = if config.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))
}
