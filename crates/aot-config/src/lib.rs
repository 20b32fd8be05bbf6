//! Array of Things dashboard configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the dashboard config file
//! - Config resolution (CLI → env → config file → defaults)
//! - Semantic validation

pub mod dashboard;
pub mod resolve;
pub mod validate;

pub use dashboard::{DashboardConfig, DataPaths, MapView};
pub use resolve::{resolve_config, resolve_with_env, ConfigOverrides, ConfigSource, ResolvedConfig};
pub use validate::{validate, ValidationError};

use thiserror::Error;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("config validation failed: {0}")]
    Invalid(String),
}

impl From<ConfigError> for aot_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(msg) => aot_common::Error::InvalidConfig(msg),
            other => aot_common::Error::Config(other.to_string()),
        }
    }
}
