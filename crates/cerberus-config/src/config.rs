//! Configuration structures.
//!
//! Every knob has a sensible default, so an empty file (or no file at all)
//! yields a working configuration. Durations are expressed in the unit
//! named by the field and converted once via the accessor methods.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the admission layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CerberusConfig {
    /// Rate limiting settings.
    pub rate_limit: RateLimitConfig,
    /// Idempotency deduplication settings.
    pub idempotency: IdempotencyConfig,
    /// Per-request deadline settings.
    pub request: RequestConfig,
}

impl CerberusConfig {
    /// Validates the configuration, rejecting values that would disable a
    /// gate outright (zero quotas, zero lifetimes, zero budgets).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.requests == 0 {
            return Err(ConfigError::invalid(
                "rate_limit.requests",
                "must be at least 1",
            ));
        }
        if self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::invalid(
                "rate_limit.window_seconds",
                "must be at least 1",
            ));
        }
        if self.idempotency.ttl_hours == 0 {
            return Err(ConfigError::invalid(
                "idempotency.ttl_hours",
                "must be at least 1",
            ));
        }
        if self.idempotency.processing_ttl_seconds == 0 {
            return Err(ConfigError::invalid(
                "idempotency.processing_ttl_seconds",
                "must be at least 1",
            ));
        }
        if self.idempotency.sweep_interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "idempotency.sweep_interval_seconds",
                "must be at least 1",
            ));
        }
        if self.request.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "request.timeout_seconds",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Rate limiter settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window per client identity.
    pub requests: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 10,
            window_seconds: 60,
        }
    }
}

impl RateLimitConfig {
    /// Returns the window as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Idempotency store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Lifetime of completed records, in hours.
    pub ttl_hours: u64,
    /// Safety lifetime of in-flight records, in seconds.
    pub processing_ttl_seconds: u64,
    /// How often the background sweeper runs, in seconds.
    pub sweep_interval_seconds: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            processing_ttl_seconds: 300,
            sweep_interval_seconds: 3600,
        }
    }
}

impl IdempotencyConfig {
    /// Returns the completed-record lifetime as a [`Duration`].
    #[must_use]
    pub const fn completed_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 60 * 60)
    }

    /// Returns the in-flight safety lifetime as a [`Duration`].
    #[must_use]
    pub const fn processing_ttl(&self) -> Duration {
        Duration::from_secs(self.processing_ttl_seconds)
    }

    /// Returns the sweep interval as a [`Duration`].
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Per-request deadline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RequestConfig {
    /// Handler budget in seconds before the request is abandoned with a 504.
    pub timeout_seconds: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

impl RequestConfig {
    /// Returns the handler budget as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CerberusConfig::default();
        assert_eq!(config.rate_limit.requests, 10);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert_eq!(config.idempotency.ttl_hours, 24);
        assert_eq!(config.idempotency.processing_ttl_seconds, 300);
        assert_eq!(config.idempotency.sweep_interval_seconds, 3600);
        assert_eq!(config.request.timeout_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_accessors() {
        let config = CerberusConfig::default();
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(
            config.idempotency.completed_ttl(),
            Duration::from_secs(24 * 60 * 60)
        );
        assert_eq!(
            config.idempotency.processing_ttl(),
            Duration::from_secs(300)
        );
        assert_eq!(
            config.idempotency.sweep_interval(),
            Duration::from_secs(3600)
        );
        assert_eq!(config.request.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_quota_rejected() {
        let mut config = CerberusConfig::default();
        config.rate_limit.requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = CerberusConfig::default();
        config.request.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let mut config = CerberusConfig::default();
        config.idempotency.sweep_interval_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CerberusConfig = toml::from_str(
            r#"
            [rate_limit]
            requests = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.requests, 100);
        assert_eq!(config.rate_limit.window_seconds, 60);
        assert_eq!(config.request.timeout_seconds, 30);
    }
}
