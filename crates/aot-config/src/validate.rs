//! Semantic validation of a parsed [`DashboardConfig`].

use crate::dashboard::DashboardConfig;
use crate::CONFIG_SCHEMA_VERSION;
use aot_common::schema::is_compatible_with;
use std::fmt;

/// A single semantic problem with a config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a config for semantic errors. An empty vector means valid.
pub fn validate(config: &DashboardConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !is_compatible_with(&config.schema_version, CONFIG_SCHEMA_VERSION) {
        errors.push(ValidationError::new(
            "schema_version",
            format!("unsupported version {}", config.schema_version),
        ));
    }
    if config.moving_average_window == 0 {
        errors.push(ValidationError::new("moving_average_window", "must be at least 1"));
    }
    if config.max_panels == 0 {
        errors.push(ValidationError::new("max_panels", "must be at least 1"));
    }

    let paths = &config.paths;
    for (field, path) in [
        ("paths.cache", &paths.cache),
        ("paths.measurements", &paths.measurements),
        ("paths.nodes", &paths.nodes),
    ] {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    let map = &config.map;
    if !(-90.0..=90.0).contains(&map.center_latitude) {
        errors.push(ValidationError::new("map.center_latitude", "must be within [-90, 90]"));
    }
    if !(-180.0..=180.0).contains(&map.center_longitude) {
        errors.push(ValidationError::new(
            "map.center_longitude",
            "must be within [-180, 180]",
        ));
    }
    if !(0.0..=22.0).contains(&map.zoom) {
        errors.push(ValidationError::new("map.zoom", "must be within [0, 22]"));
    }
    if map.default_color.trim().is_empty() {
        errors.push(ValidationError::new("map.default_color", "must not be empty"));
    }

    errors
}
