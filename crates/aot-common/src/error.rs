//! Error types for the AoT dashboard data core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for AoT dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the AoT dashboard data core.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration file: {0}")]
    InvalidConfig(String),

    // Source data errors (20-29)
    #[error("source file not found: {}", path.display())]
    MissingSourceFile { path: PathBuf },

    #[error("measurement on line {line} references node {node_id} with no metadata entry")]
    MissingNode { node_id: String, line: u64 },

    #[error("node {node_id} appears more than once in node metadata")]
    DuplicateNode { node_id: String },

    #[error("malformed record in {} at line {line}: {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("invalid timestamp: {value:?}")]
    InvalidTimestamp { value: String },

    #[error("table schema validation failed: {0}")]
    SchemaValidation(String),

    // Cache errors (30-39)
    #[error("cache file is corrupted (delete it to force a rebuild): {0}")]
    CacheCorrupted(String),

    #[error("cache schema version {found} is not compatible (expected {expected}); delete the cache to rebuild")]
    IncompatibleCache { found: String, expected: String },

    #[error("failed to write cache: {0}")]
    CacheWrite(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render output: {0}")]
    Render(String),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::MissingSourceFile { .. } => 20,
            Error::MissingNode { .. } => 21,
            Error::DuplicateNode { .. } => 22,
            Error::MalformedRecord { .. } => 23,
            Error::InvalidTimestamp { .. } => 24,
            Error::SchemaValidation(_) => 25,
            Error::CacheCorrupted(_) => 30,
            Error::IncompatibleCache { .. } => 31,
            Error::CacheWrite(_) => 32,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::Render(_) => 62,
        }
    }

    /// True for errors caused by inconsistent source data rather than
    /// missing files or a broken environment.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Error::MissingNode { .. }
                | Error::DuplicateNode { .. }
                | Error::MalformedRecord { .. }
                | Error::InvalidTimestamp { .. }
                | Error::SchemaValidation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_node_names_node() {
        let err = Error::MissingNode {
            node_id: "N2".to_string(),
            line: 3,
        };
        assert!(err.to_string().contains("N2"));
        assert_eq!(err.code(), 21);
        assert!(err.is_data_integrity());
    }

    #[test]
    fn test_code_groups() {
        let missing = Error::MissingSourceFile {
            path: PathBuf::from("data/data.csv"),
        };
        assert_eq!(missing.code() / 10, 2);
        assert!(!missing.is_data_integrity());
        assert_eq!(Error::CacheCorrupted("bad footer".into()).code() / 10, 3);
        assert_eq!(Error::Config("x".into()).code() / 10, 1);
    }
}
