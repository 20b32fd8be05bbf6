//! Dashboard configuration types.
//!
//! Every field has a default so a partial (or absent) config file works.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Default location of the serialized table cache.
pub const DEFAULT_CACHE_PATH: &str = "data/preprocessed_data.parquet";

/// Default measurement log.
pub const DEFAULT_MEASUREMENTS_PATH: &str = "data/data.csv";

/// Default node metadata table.
pub const DEFAULT_NODES_PATH: &str = "data/nodes.csv";

/// Complete dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub schema_version: String,

    pub paths: DataPaths,

    /// Trailing window for the moving-average smoother, in samples.
    pub moving_average_window: usize,

    /// Maximum number of day panels rendered side by side.
    pub max_panels: usize,

    pub map: MapView,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            paths: DataPaths::default(),
            moving_average_window: 10,
            max_panels: 2,
            map: MapView::default(),
        }
    }
}

/// Locations of the source files and the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub cache: PathBuf,
    pub measurements: PathBuf,
    pub nodes: PathBuf,
}

impl DataPaths {
    /// Default file names rooted at `dir` instead of `data/`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            cache: dir.join("preprocessed_data.parquet"),
            measurements: dir.join("data.csv"),
            nodes: dir.join("nodes.csv"),
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            cache: PathBuf::from(DEFAULT_CACHE_PATH),
            measurements: PathBuf::from(DEFAULT_MEASUREMENTS_PATH),
            nodes: PathBuf::from(DEFAULT_NODES_PATH),
        }
    }
}

/// Initial view and marker styling of the node map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapView {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub zoom: f64,
    pub default_color: String,
    /// Marker color per node id.
    pub node_colors: HashMap<String, String>,
}

impl MapView {
    pub fn color_for(&self, node_id: &str) -> &str {
        self.node_colors
            .get(node_id)
            .map(String::as_str)
            .unwrap_or(&self.default_color)
    }
}

impl Default for MapView {
    fn default() -> Self {
        // Ashland Ave. station, Chicago.
        Self {
            center_latitude: 41.839066,
            center_longitude: -87.665685,
            zoom: 17.0,
            default_color: "blue".to_string(),
            node_colors: HashMap::new(),
        }
    }
}
