//! Exit codes for the aot-dash CLI.
//!
//! Exit codes communicate the outcome without requiring output parsing.
//! An empty query result is a success.

use aot_common::Error;

/// Exit codes for aot-dash operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed (possibly with zero matching rows)
    Clean = 0,

    /// Configuration error
    ConfigError = 10,

    /// A source file is missing and no cache exists
    SourceMissing = 11,

    /// Source data is inconsistent (unknown node, malformed row)
    DataIntegrity = 12,

    /// Cache file unreadable or incompatible
    CacheError = 13,

    /// I/O error
    IoError = 14,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean)
    }

    /// Map a library error onto its exit code.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::MissingSourceFile { .. } => ExitCode::SourceMissing,
            e if e.is_data_integrity() => ExitCode::DataIntegrity,
            e => match e.code() {
                10..=19 => ExitCode::ConfigError,
                30..=39 => ExitCode::CacheError,
                60..=69 => ExitCode::IoError,
                _ => ExitCode::InternalError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
