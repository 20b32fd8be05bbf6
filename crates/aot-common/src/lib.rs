//! Array of Things dashboard common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the aot crates:
//! - Node identity type
//! - The denormalized measurement table and its row schema
//! - Schema versioning for the on-disk cache
//! - Common error types
//! - Output formats

pub mod error;
pub mod id;
pub mod output;
pub mod schema;
pub mod table;

pub use error::{Error, Result};
pub use id::NodeId;
pub use output::OutputFormat;
pub use schema::{COLUMNS, TABLE_SCHEMA_VERSION};
pub use table::{Row, Table};
