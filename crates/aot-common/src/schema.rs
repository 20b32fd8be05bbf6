//! Table schema versioning and compatibility.

/// Current schema version of the denormalized table as written to the cache.
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: Breaking changes (column removals, type changes)
/// - MINOR: Additive changes (new nullable columns)
/// - PATCH: Bug fixes, documentation
pub const TABLE_SCHEMA_VERSION: &str = "1.0.0";

/// Column names of the denormalized table, in storage order.
pub const COLUMNS: [&str; 11] = [
    "date",
    "time",
    "node_id",
    "latitude",
    "longitude",
    "address",
    "description",
    "subsystem",
    "sensor",
    "parameter",
    "value_hrf",
];

/// Check if a cached table schema version can be read by this build.
pub fn is_compatible(version: &str) -> bool {
    is_compatible_with(version, TABLE_SCHEMA_VERSION)
}

/// Check if `version` shares its major component with `current`.
pub fn is_compatible_with(version: &str, current: &str) -> bool {
    let major = |v: &str| v.split('.').next().and_then(|s| s.parse::<u32>().ok());
    match (major(version), major(current)) {
        (Some(found), Some(expected)) => found == expected,
        _ => false,
    }
}
