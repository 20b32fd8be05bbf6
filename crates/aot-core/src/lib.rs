//! Array of Things dashboard data core.
//!
//! Loads the measurement log and node metadata into one denormalized
//! [`Table`](aot_common::Table), caches it on disk, and provides the filter
//! primitives every dashboard view composes:
//!
//! - [`loader`]: cold/warm load and the shared [`loader::TableHandle`]
//! - [`filter`]: by day, time of day, date range, node, sensor path
//! - [`query`]: the composed drill-down
//! - [`options`], [`map`], [`series`]: data behind dropdowns, map, and plots

pub mod cli;
pub mod exit_codes;
pub mod filter;
pub mod ingest;
pub mod loader;
pub mod logging;
pub mod map;
pub mod options;
pub mod processing;
pub mod query;
pub mod series;

pub use filter::{
    filter_by_date_range, filter_by_day, filter_by_days, filter_by_node_id,
    filter_by_sensor_path, filter_by_time, SensorPath,
};
pub use loader::{get_table, install, load, TableHandle};
pub use query::Query;
