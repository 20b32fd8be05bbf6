//! Array of Things table cache storage.
//!
//! This crate provides:
//! - The Arrow schema of the denormalized measurement table
//! - Row ⇄ record batch conversion
//! - A Parquet-backed on-disk cache of the table

pub mod cache;
pub mod schema;

pub use cache::{CacheStatus, StoreError, TableCache};
pub use schema::{decode_batch, encode_batch, pretty_format, table_schema};

/// Parquet key/value metadata entry carrying the table schema version.
pub const SCHEMA_VERSION_KEY: &str = "aot.table_schema_version";
