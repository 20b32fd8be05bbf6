//! Parquet-backed cache of the denormalized table.
//!
//! The cache is a single Parquet file. Its presence alone decides whether the
//! loader rebuilds: there is no freshness check against the source files, so
//! an operator deletes the file (or calls [`TableCache::clear`]) to force a
//! rebuild. A file that cannot be decoded is reported, never silently
//! replaced.

use crate::schema::{decode_batch, encode_batch};
use crate::SCHEMA_VERSION_KEY;
use aot_common::schema::is_compatible;
use aot_common::{Table, TABLE_SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache write failed: {0}")]
    Write(String),

    #[error("cache file corrupted: {0}")]
    Corrupted(String),

    #[error("cache schema version {found} is not compatible (expected {expected})")]
    IncompatibleVersion { found: String, expected: String },

    #[error("table rendering failed: {0}")]
    Render(String),
}

impl From<StoreError> for aot_common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => aot_common::Error::Io(e),
            StoreError::Write(msg) => aot_common::Error::CacheWrite(msg),
            StoreError::Corrupted(msg) => aot_common::Error::CacheCorrupted(msg),
            StoreError::IncompatibleVersion { found, expected } => {
                aot_common::Error::IncompatibleCache { found, expected }
            }
            StoreError::Render(msg) => aot_common::Error::Render(msg),
        }
    }
}

/// What is known about the cache file without decoding its rows.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<i64>,
}

/// Table cache at a fixed path.
#[derive(Debug, Clone)]
pub struct TableCache {
    path: PathBuf,
}

impl TableCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the cached table, or `None` if no cache file exists.
    pub fn load(&self) -> Result<Option<Table>, StoreError> {
        if !self.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;

        let version = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .and_then(|kvs| kvs.iter().find(|kv| kv.key == SCHEMA_VERSION_KEY))
            .and_then(|kv| kv.value.clone())
            .ok_or_else(|| StoreError::Corrupted("missing table schema version".to_string()))?;
        if !is_compatible(&version) {
            return Err(StoreError::IncompatibleVersion {
                found: version,
                expected: TABLE_SCHEMA_VERSION.to_string(),
            });
        }

        let reader = builder
            .build()
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| StoreError::Corrupted(e.to_string()))?;
            decode_batch(&batch, &mut rows)?;
        }

        let table = Table::try_new(rows).map_err(|e| StoreError::Corrupted(e.to_string()))?;
        debug!(path = %self.path.display(), rows = table.len(), "table loaded from cache");
        Ok(Some(table))
    }

    /// Write the table to the cache atomically (temp file + rename).
    pub fn store(&self, table: &Table) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let batch = encode_batch(table.rows())?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::default()))
            .set_key_value_metadata(Some(vec![KeyValue::new(
                SCHEMA_VERSION_KEY.to_string(),
                TABLE_SCHEMA_VERSION.to_string(),
            )]))
            .build();

        let tmp_path = self.path.with_extension("parquet.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
                .map_err(|e| StoreError::Write(e.to_string()))?;
            writer
                .write(&batch)
                .map_err(|e| StoreError::Write(e.to_string()))?;
            writer
                .close()
                .map_err(|e| StoreError::Write(e.to_string()))?;
        }
        fs::rename(&tmp_path, &self.path)?;

        info!(path = %self.path.display(), rows = table.len(), "table cached");
        Ok(())
    }

    /// Delete the cache file. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool, StoreError> {
        if !self.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        info!(path = %self.path.display(), "cache cleared");
        Ok(true)
    }

    /// Inspect the cache file's metadata without decoding rows.
    pub fn status(&self) -> Result<CacheStatus, StoreError> {
        if !self.exists() {
            return Ok(CacheStatus {
                path: self.path.clone(),
                exists: false,
                size_bytes: None,
                modified: None,
                schema_version: None,
                rows: None,
            });
        }

        let meta = fs::metadata(&self.path)?;
        let modified = meta.modified().ok().map(DateTime::<Utc>::from);
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&self.path)?)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let file_meta = builder.metadata().file_metadata();
        let schema_version = file_meta
            .key_value_metadata()
            .and_then(|kvs| kvs.iter().find(|kv| kv.key == SCHEMA_VERSION_KEY))
            .and_then(|kv| kv.value.clone());

        Ok(CacheStatus {
            path: self.path.clone(),
            exists: true,
            size_bytes: Some(meta.len()),
            modified,
            schema_version,
            rows: Some(file_meta.num_rows()),
        })
    }
}
