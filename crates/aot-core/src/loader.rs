//! Table loading with the on-disk cache and the process-wide handle.
//!
//! [`load`] is the cold/warm start routine: an existing cache file is trusted
//! as-is, otherwise the source files are joined and the result cached.
//! [`TableHandle`] wraps it so the first caller pays the I/O cost and every
//! later caller shares the same `Arc<Table>`.

use crate::ingest;
use aot_common::{Error, Result, Table};
use aot_config::DataPaths;
use aot_store::TableCache;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Load the denormalized table.
///
/// If `cache_path` exists its contents are returned unchanged; no check is
/// made against the source files. Otherwise the table is built from
/// `measurements_path` and `nodes_path` and written to `cache_path`.
/// A failed cache write is logged and the freshly built table is still
/// returned.
pub fn load(cache_path: &Path, measurements_path: &Path, nodes_path: &Path) -> Result<Table> {
    let cache = TableCache::new(cache_path);
    let started = Instant::now();

    if let Some(table) = cache.load()? {
        info!(
            path = %cache_path.display(),
            rows = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "using cached table"
        );
        return Ok(table);
    }

    let table = ingest::build_table(measurements_path, nodes_path)?;
    if let Err(e) = cache.store(&table) {
        warn!(error = %e, path = %cache_path.display(), "failed to cache table");
    }
    Ok(table)
}

/// Lazily loaded, shared, read-only table.
#[derive(Debug)]
pub struct TableHandle {
    paths: DataPaths,
    table: OnceLock<Arc<Table>>,
    init: Mutex<()>,
}

impl TableHandle {
    pub fn new(paths: DataPaths) -> Self {
        Self {
            paths,
            table: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn is_loaded(&self) -> bool {
        self.table.get().is_some()
    }

    /// Return the table, loading it on the first call.
    ///
    /// Concurrent first callers block until the single load finishes. A
    /// failed load leaves the handle empty, so a later call retries.
    pub fn get(&self) -> Result<Arc<Table>> {
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = self.table.get() {
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(load(
            &self.paths.cache,
            &self.paths.measurements,
            &self.paths.nodes,
        )?);
        let table = Arc::clone(self.table.get_or_init(|| table));
        debug!(rows = table.len(), "table handle initialized");
        Ok(table)
    }
}

static GLOBAL: OnceLock<TableHandle> = OnceLock::new();

/// Install the process-wide handle. Installing again with the same paths
/// returns the existing handle; different paths are a configuration error.
pub fn install(paths: DataPaths) -> Result<&'static TableHandle> {
    let mut installed_now = false;
    let handle = GLOBAL.get_or_init(|| {
        installed_now = true;
        TableHandle::new(paths.clone())
    });
    if installed_now || handle.paths() == &paths {
        Ok(handle)
    } else {
        Err(Error::Config(format!(
            "table handle already installed for {}",
            handle.paths().cache.display()
        )))
    }
}

/// The shared table from the installed handle, loading it on first use.
pub fn get_table() -> Result<Arc<Table>> {
    GLOBAL
        .get()
        .ok_or_else(|| Error::Config("table handle not installed".to_string()))?
        .get()
}
