//! Configuration for the Cerberus admission layer.
//!
//! Settings layer from built-in defaults, an optional TOML file, and
//! `CERBERUS__SECTION__KEY` environment variables. See [`load`].

mod config;
mod error;
mod loader;

pub use config::{CerberusConfig, IdempotencyConfig, RateLimitConfig, RequestConfig};
pub use error::ConfigError;
pub use loader::{apply_env_overrides, load, load_from_path, CONFIG_PATH_VAR, DEFAULT_CONFIG_PATH};
