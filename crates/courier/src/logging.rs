//! Logging bootstrap.
//!
//! Every component logs through `tracing` macros; this module only decides
//! where the events go. `RUST_LOG` takes precedence over the configured level.

use crate::error::{CourierError, CourierResult};
use std::str::FromStr;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(CourierError::Config(format!("Unknown log format: {}", other))),
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, attached to the startup line.
    pub service_name: String,

    /// Default filter directive (e.g., "info", "delivery_queue=debug").
    /// Overridden by `RUST_LOG`.
    pub default_level: String,

    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "courier".into(),
            default_level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

/// Build the filter: `RUST_LOG` if set and valid, else `default_level`.
pub fn env_filter(default_level: &str) -> CourierResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(default_level)
        .map_err(|e| CourierError::Logging(format!("Invalid log level '{}': {}", default_level, e)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_with_config(config: &LogConfig) -> CourierResult<()> {
    let filter = env_filter(&config.default_level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Compact => builder.compact().finish().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).finish().try_init(),
    };
    result.map_err(|e| CourierError::Logging(e.to_string()))?;

    tracing::debug!(service = %config.service_name, format = ?config.format, "Logging initialized");
    Ok(())
}
