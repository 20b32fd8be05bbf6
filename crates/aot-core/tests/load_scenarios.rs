//! End-to-end load scenarios against small on-disk fixtures.
//!
//! Covers:
//! - cold load joins measurements with node metadata and writes the cache
//! - warm load returns the cached table unchanged, even if sources moved
//! - measurement for an unknown node aborts the build
//! - missing source files without a cache
//! - drill-down through the filter chain on a realistic node

use aot_common::{Error, Table};
use aot_config::DataPaths;
use aot_core::{
    filter_by_date_range, filter_by_day, filter_by_node_id, filter_by_sensor_path, filter_by_time,
    load, Query, SensorPath, TableHandle,
};
use chrono::{NaiveDate, NaiveTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

// ============================================================================
// Fixtures
// ============================================================================

const NODES: &str = "\
node_id,project_id,vsn,address,lat,lon,description,start_timestamp,end_timestamp
001e06113acb,AoT_Chicago,004,State St & Jackson Blvd Chicago IL,41.878114,-87.627579,AoT Chicago (S),2017/08/01 00:00:00,
001e0610ba46,AoT_Chicago,00A,Lake Shore Dr & 63rd St Chicago IL,41.780563,-87.576127,AoT Chicago (S) [C],2017/09/01 00:00:00,
";

const MEASUREMENTS: &str = "\
timestamp,node_id,subsystem,sensor,parameter,value_raw,value_hrf
2020/08/24 07:59:59,001e06113acb,metsense,tsys01,temperature,2410,24.10
2020/08/24 08:00:00,001e06113acb,metsense,tsys01,temperature,2415,24.15
2020/08/24 08:00:00,001e06113acb,metsense,htu21d,humidity,5122,51.22
2020/08/24 08:00:25,001e06113acb,lightsense,tsl260rd,intensity,120,1.2
2020/08/24 08:00:25,001e0610ba46,chemsense,co,concentration,3,0.3
2020/08/25 08:00:00,001e06113acb,metsense,tsys01,temperature,2380,23.80
2020/08/25 12:30:00,001e0610ba46,metsense,tsys01,temperature,2501,25.01
2020/08/27 08:00:00,001e06113acb,metsense,tsys01,temperature,2299,22.99
";

struct Fixture {
    _dir: TempDir,
    paths: DataPaths,
}

fn write_fixture(measurements: &str, nodes: &str) -> Fixture {
    let dir = tempdir().expect("tempdir");
    let paths = DataPaths::in_dir(dir.path());
    fs::write(&paths.measurements, measurements).expect("write measurements");
    fs::write(&paths.nodes, nodes).expect("write nodes");
    Fixture { _dir: dir, paths }
}

fn load_paths(paths: &DataPaths) -> aot_common::Result<Table> {
    load(&paths.cache, &paths.measurements, &paths.nodes)
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 8, day).unwrap()
}

fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
}

// ============================================================================
// Cold / warm load
// ============================================================================

#[test]
fn test_cold_load_joins_and_caches() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    assert!(!fx.paths.cache.exists());

    let table = load_paths(&fx.paths).expect("cold load");
    assert_eq!(table.len(), 8);
    assert!(fx.paths.cache.exists(), "cold load should write the cache");

    let first = table.first().unwrap();
    assert_eq!(first.node_id.as_str(), "001e06113acb");
    assert_eq!(first.address, "State St & Jackson Blvd Chicago IL");
    assert_eq!(first.description, "AoT Chicago (S)");
    assert_eq!(first.latitude, 41.878114);
    assert_eq!(first.longitude, -87.627579);
    assert_eq!(first.date, date(24));
    assert_eq!(first.time, hms(7, 59, 59));
    assert_eq!(first.value_hrf, "24.10");
}

#[test]
fn test_warm_load_matches_cold_load() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let cold = load_paths(&fx.paths).expect("cold load");
    let warm = load_paths(&fx.paths).expect("warm load");
    assert_eq!(cold, warm);
}

#[test]
fn test_cache_is_trusted_without_sources() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let cold = load_paths(&fx.paths).expect("cold load");

    fs::remove_file(&fx.paths.measurements).unwrap();
    fs::remove_file(&fx.paths.nodes).unwrap();

    let warm = load_paths(&fx.paths).expect("cache alone should suffice");
    assert_eq!(cold, warm);
}

#[test]
fn test_cache_not_refreshed_when_sources_change() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let cold = load_paths(&fx.paths).expect("cold load");

    let extra = format!(
        "{MEASUREMENTS}2020/08/28 09:00:00,001e06113acb,metsense,tsys01,temperature,2200,22.00\n"
    );
    fs::write(&fx.paths.measurements, extra).unwrap();

    let warm = load_paths(&fx.paths).expect("warm load");
    assert_eq!(warm.len(), cold.len());
}

#[test]
fn test_leap_and_fractional_seconds_survive_cache() {
    let fx = write_fixture(
        "timestamp,node_id,subsystem,sensor,parameter,value_hrf\n\
         2020/08/24 23:59:60,001e06113acb,metsense,tsys01,temperature,21.40\n\
         2020/08/24 08:00:05.123456789,001e06113acb,metsense,tsys01,temperature,21.50\n",
        NODES,
    );
    let cold = load_paths(&fx.paths).expect("cold load");
    assert_eq!(
        cold.rows()[0].time,
        NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap()
    );
    assert_eq!(cold.rows()[0].date, date(24));
    assert_eq!(
        cold.rows()[1].time,
        NaiveTime::from_hms_micro_opt(8, 0, 5, 123_456).unwrap()
    );

    let warm = load_paths(&fx.paths).expect("cached load");
    assert_eq!(cold, warm);
}

// ============================================================================
// Failure paths
// ============================================================================

#[test]
fn test_unknown_node_aborts_build() {
    let measurements = format!(
        "{MEASUREMENTS}2020/08/24 09:00:00,001e0610ffff,metsense,tsys01,temperature,2200,22.00\n"
    );
    let fx = write_fixture(&measurements, NODES);

    let err = load_paths(&fx.paths).unwrap_err();
    match &err {
        Error::MissingNode { node_id, .. } => assert_eq!(node_id, "001e0610ffff"),
        other => panic!("expected MissingNode, got {other:?}"),
    }
    assert!(err.is_data_integrity());
    assert!(!fx.paths.cache.exists(), "no cache on failed build");
}

#[test]
fn test_missing_measurements_without_cache() {
    let dir = tempdir().unwrap();
    let paths = DataPaths::in_dir(dir.path());
    fs::write(&paths.nodes, NODES).unwrap();

    let err = load_paths(&paths).unwrap_err();
    match err {
        Error::MissingSourceFile { path } => assert_eq!(path, paths.measurements),
        other => panic!("expected MissingSourceFile, got {other:?}"),
    }
}

#[test]
fn test_missing_nodes_without_cache() {
    let dir = tempdir().unwrap();
    let paths = DataPaths::in_dir(dir.path());
    fs::write(&paths.measurements, MEASUREMENTS).unwrap();

    let err = load_paths(&paths).unwrap_err();
    assert!(matches!(err, Error::MissingSourceFile { .. }));
}

#[test]
fn test_header_only_sources_give_empty_table() {
    let fx = write_fixture(
        "timestamp,node_id,subsystem,sensor,parameter,value_hrf\n",
        "node_id,address,lat,lon,description\n",
    );
    let table = load_paths(&fx.paths).expect("empty load");
    assert!(table.is_empty());

    let warm = load_paths(&fx.paths).expect("empty warm load");
    assert!(warm.is_empty());
}

#[test]
fn test_cache_in_unwritable_location_still_loads() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    // A regular file where the cache's parent directory should be.
    let blocker = fx.paths.measurements.parent().unwrap().join("blocked");
    fs::write(&blocker, "").unwrap();
    let cache: PathBuf = blocker.join("cache.parquet");

    let table = load(&cache, &fx.paths.measurements, &fx.paths.nodes).expect("load");
    assert_eq!(table.len(), 8);
    assert!(!cache.exists());
}

// ============================================================================
// Drill-down
// ============================================================================

#[test]
fn test_node_drill_down() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let table = load_paths(&fx.paths).unwrap();

    let node = filter_by_node_id(&table, "001e06113acb");
    assert_eq!(node.len(), 6);

    let temps = filter_by_sensor_path(
        &node,
        &SensorPath::new()
            .subsystem("metsense")
            .sensor("tsys01")
            .parameter("temperature"),
    );
    assert_eq!(temps.len(), 4);

    let monday = filter_by_day(&temps, date(24));
    let values: Vec<_> = monday.iter().map(|r| r.value_hrf.as_str()).collect();
    assert_eq!(values, vec!["24.10", "24.15"]);
}

#[test]
fn test_eight_oclock_window_is_inclusive_on_both_ends() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let table = load_paths(&fx.paths).unwrap();

    let at_eight = filter_by_time(&table, hms(8, 0, 0), hms(8, 0, 0));
    assert_eq!(at_eight.len(), 4);
    assert!(at_eight.iter().all(|r| r.time == hms(8, 0, 0)));
}

#[test]
fn test_date_range_ignores_time_of_day() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let table = load_paths(&fx.paths).unwrap();

    let start = date(24).and_hms_opt(23, 59, 0).unwrap();
    let end = date(25).and_hms_opt(0, 0, 1).unwrap();
    let range = filter_by_date_range(&table, start, end);
    assert_eq!(range.len(), 7);
    assert!(range.iter().all(|r| r.date <= date(25)));
}

#[test]
fn test_query_composes_all_stages() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let table = load_paths(&fx.paths).unwrap();

    let rows = Query::new()
        .node("001e06113acb")
        .path(SensorPath::new().subsystem("metsense"))
        .day(date(24))
        .day(date(25))
        .time_range(hms(8, 0, 0), hms(8, 59, 59))
        .apply(&table);
    let sensors: Vec<_> = rows.iter().map(|r| r.sensor.as_str()).collect();
    assert_eq!(sensors, vec!["tsys01", "htu21d", "tsys01"]);
}

#[test]
fn test_unknown_node_filter_is_empty_not_error() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let table = load_paths(&fx.paths).unwrap();
    assert!(filter_by_node_id(&table, "001e0600dead").is_empty());
}

#[test]
fn test_single_row_drill_down_yields_that_row() {
    let fx = write_fixture(
        "timestamp,node_id,subsystem,sensor,parameter,value_hrf\n\
         2020/08/24 10:15:00,N1,metsense,temp,temperature,21.4\n",
        "node_id,address,lat,lon,description\nN1,Ashland Ave,41.839,-87.665,AoT Chicago\n",
    );
    let table = load_paths(&fx.paths).unwrap();

    let out = filter_by_day(
        &filter_by_sensor_path(
            &filter_by_node_id(&table, "N1"),
            &SensorPath::new().subsystem("metsense"),
        ),
        date(24),
    );
    assert_eq!(out.len(), 1);
    let row = out.first().unwrap();
    assert_eq!(row.sensor, "temp");
    assert_eq!(row.parameter, "temperature");
    assert_eq!(row.address, "Ashland Ave");
}

#[test]
fn test_node_without_metadata_is_named() {
    let fx = write_fixture(
        "timestamp,node_id,subsystem,sensor,parameter,value_hrf\n\
         2020/08/24 10:15:00,N1,metsense,temp,temperature,21.4\n\
         2020/08/24 10:16:00,N2,metsense,temp,temperature,21.5\n",
        "node_id,address,lat,lon,description\nN1,Ashland Ave,41.839,-87.665,AoT Chicago\n",
    );
    let err = load_paths(&fx.paths).unwrap_err();
    assert!(matches!(&err, Error::MissingNode { node_id, line: 3 } if node_id == "N2"));
    assert!(err.to_string().contains("N2"));
}

// ============================================================================
// Shared handle
// ============================================================================

#[test]
fn test_handle_builds_once_and_caches() {
    let fx = write_fixture(MEASUREMENTS, NODES);
    let handle = TableHandle::new(fx.paths.clone());
    assert!(!handle.is_loaded());

    let a = handle.get().unwrap();
    let b = handle.get().unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert!(handle.is_loaded());
    assert!(Path::new(&fx.paths.cache).exists());
}
