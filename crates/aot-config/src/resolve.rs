//! Config resolution: CLI overrides → environment → config file → defaults.

use crate::dashboard::{DashboardConfig, DataPaths};
use crate::validate::validate;
use crate::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "AOT_CONFIG";
/// Environment variable rooting all three data paths in one directory.
pub const ENV_DATA_DIR: &str = "AOT_DATA_DIR";
pub const ENV_CACHE_PATH: &str = "AOT_CACHE_PATH";
pub const ENV_MEASUREMENTS_PATH: &str = "AOT_MEASUREMENTS_PATH";
pub const ENV_NODES_PATH: &str = "AOT_NODES_PATH";

/// Values given explicitly on the command line. They win over everything.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub measurements: Option<PathBuf>,
    pub nodes: Option<PathBuf>,
    pub moving_average_window: Option<usize>,
}

/// Where the base configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: DashboardConfig,
    pub source: ConfigSource,
}

impl ResolvedConfig {
    pub fn using_defaults(&self) -> bool {
        self.source == ConfigSource::Defaults
    }
}

/// Per-user config file location (`$XDG_CONFIG_HOME/aot_dashboard/config.json`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aot_dashboard").join("config.json"))
}

/// Resolve configuration from the process environment.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig, ConfigError> {
    resolve_with_env(overrides, |key| std::env::var(key).ok(), default_config_path())
}

/// Resolve configuration with an injectable environment lookup.
///
/// `user_config` is consulted only if it exists; an explicitly named config
/// file (flag or `AOT_CONFIG`) must exist.
pub fn resolve_with_env<F>(
    overrides: &ConfigOverrides,
    env: F,
    user_config: Option<PathBuf>,
) -> Result<ResolvedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit = overrides
        .config_file
        .clone()
        .or_else(|| env(ENV_CONFIG).map(PathBuf::from));

    let (mut config, source) = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            (load_file(&path)?, ConfigSource::File(path))
        }
        None => match user_config.filter(|p| p.exists()) {
            Some(path) => (load_file(&path)?, ConfigSource::File(path)),
            None => (DashboardConfig::default(), ConfigSource::Defaults),
        },
    };

    apply_paths(
        &mut config.paths,
        env(ENV_DATA_DIR).map(PathBuf::from),
        env(ENV_CACHE_PATH).map(PathBuf::from),
        env(ENV_MEASUREMENTS_PATH).map(PathBuf::from),
        env(ENV_NODES_PATH).map(PathBuf::from),
    );
    apply_paths(
        &mut config.paths,
        overrides.data_dir.clone(),
        overrides.cache.clone(),
        overrides.measurements.clone(),
        overrides.nodes.clone(),
    );
    if let Some(window) = overrides.moving_average_window {
        config.moving_average_window = window;
    }

    let errors = validate(&config);
    if !errors.is_empty() {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::Invalid(joined));
    }

    debug!(?source, paths = ?config.paths, "configuration resolved");
    Ok(ResolvedConfig { config, source })
}

fn apply_paths(
    paths: &mut DataPaths,
    dir: Option<PathBuf>,
    cache: Option<PathBuf>,
    measurements: Option<PathBuf>,
    nodes: Option<PathBuf>,
) {
    if let Some(dir) = dir {
        *paths = DataPaths::in_dir(dir);
    }
    if let Some(cache) = cache {
        paths.cache = cache;
    }
    if let Some(measurements) = measurements {
        paths.measurements = measurements;
    }
    if let Some(nodes) = nodes {
        paths.nodes = nodes;
    }
}

fn load_file(path: &Path) -> Result<DashboardConfig, ConfigError> {
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
        path: display,
        source,
    })
}
