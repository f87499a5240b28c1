//! Configuration loading with layered sources.
//!
//! Resolution order, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (optional; missing file is not an error)
//! 3. `CERBERUS__<SECTION>__<KEY>` environment variables
//!
//! The double underscore separates the section from the key, so
//! `CERBERUS__RATE_LIMIT__REQUESTS=100` overrides `rate_limit.requests`.

use crate::config::CerberusConfig;
use crate::error::ConfigError;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Environment variable naming the config file path.
pub const CONFIG_PATH_VAR: &str = "CERBERUS_CONFIG";

/// Default config file consulted when [`CONFIG_PATH_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "cerberus.toml";

/// Loads configuration from the default locations.
///
/// Reads the file named by `CERBERUS_CONFIG` (falling back to
/// `cerberus.toml` in the working directory), then applies environment
/// overrides and validates the result.
pub fn load() -> Result<CerberusConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from_path(&path)
}

/// Loads configuration from `path`, tolerating a missing file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<CerberusConfig, ConfigError> {
    let path = path.as_ref();

    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "loaded config file");
        config
    } else {
        debug!(path = %path.display(), "config file not found, using defaults");
        CerberusConfig::default()
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

/// Applies `CERBERUS__*` environment overrides onto `config`.
pub fn apply_env_overrides(config: &mut CerberusConfig) -> Result<(), ConfigError> {
    override_var(
        "CERBERUS__RATE_LIMIT__REQUESTS",
        &mut config.rate_limit.requests,
    )?;
    override_var(
        "CERBERUS__RATE_LIMIT__WINDOW_SECONDS",
        &mut config.rate_limit.window_seconds,
    )?;
    override_var(
        "CERBERUS__IDEMPOTENCY__TTL_HOURS",
        &mut config.idempotency.ttl_hours,
    )?;
    override_var(
        "CERBERUS__IDEMPOTENCY__PROCESSING_TTL_SECONDS",
        &mut config.idempotency.processing_ttl_seconds,
    )?;
    override_var(
        "CERBERUS__IDEMPOTENCY__SWEEP_INTERVAL_SECONDS",
        &mut config.idempotency.sweep_interval_seconds,
    )?;
    override_var(
        "CERBERUS__REQUEST__TIMEOUT_SECONDS",
        &mut config.request.timeout_seconds,
    )?;
    Ok(())
}

fn override_var<T>(var: &str, slot: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(var) {
        *slot = raw.parse().map_err(|err: T::Err| ConfigError::InvalidEnv {
            var: var.to_string(),
            reason: err.to_string(),
        })?;
        debug!(var, value = %raw, "applied environment override");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_from_path("/nonexistent/cerberus.toml").unwrap();
        assert_eq!(config, CerberusConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[rate_limit]\nrequests = 5\nwindow_seconds = 10\n\n[request]\ntimeout_seconds = 2"
        )
        .unwrap();

        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.rate_limit.requests, 5);
        assert_eq!(config.rate_limit.window_seconds, 10);
        assert_eq!(config.request.timeout_seconds, 2);
        // Untouched section keeps its defaults.
        assert_eq!(config.idempotency.ttl_hours, 24);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rate_limit = \"not a table\"").unwrap();

        assert!(matches!(
            load_from_path(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_values_rejected_after_merge() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit]\nrequests = 0").unwrap();

        assert!(matches!(
            load_from_path(file.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }

    // Environment override behavior is exercised through `override_var`
    // directly; mutating process-global env vars in parallel tests races.
    #[test]
    fn test_override_var_parses() {
        let var = "CERBERUS_TEST_OVERRIDE_REQUESTS";
        std::env::set_var(var, "42");
        let mut slot = 10u32;
        override_var(var, &mut slot).unwrap();
        std::env::remove_var(var);
        assert_eq!(slot, 42);
    }

    #[test]
    fn test_override_var_rejects_garbage() {
        let var = "CERBERUS_TEST_OVERRIDE_GARBAGE";
        std::env::set_var(var, "not-a-number");
        let mut slot = 10u32;
        let result = override_var(var, &mut slot);
        std::env::remove_var(var);
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
        assert_eq!(slot, 10);
    }
}
