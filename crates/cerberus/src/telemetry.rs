//! Logging setup for binaries and integration tests.
//!
//! The gates emit `tracing` events; this module wires a subscriber so those
//! events go somewhere. Library users embedding Cerberus in a host that
//! already installs a subscriber should skip this entirely.

use thiserror::Error;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Errors from subscriber installation.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The filter string or subscriber registration was rejected.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive, e.g. `"info"` or `"cerberus_gates=debug"`.
    /// Overridden by `RUST_LOG` when set.
    pub level: String,
    /// JSON output when `true`, human-readable otherwise.
    pub json_format: bool,
    /// Whether to emit span open/close events.
    pub span_events: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            span_events: false,
        }
    }
}

impl LogConfig {
    /// Human-readable output at debug level, for local development.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// Fails if a subscriber is already installed in this process.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid log filter: {e}")))?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_filter(filter);
        tracing_subscriber::registry()
            .with(layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_filter(filter);
        tracing_subscriber::registry()
            .with(layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_json_info() {
        let config = LogConfig::default();
        assert!(config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config_is_pretty_debug() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.span_events);
        assert_eq!(config.level, "debug");
    }
}
