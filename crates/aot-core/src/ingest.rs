//! Source file ingestion and the node join.
//!
//! Two CSV inputs are read:
//!
//! - the measurement log (`timestamp,node_id,subsystem,sensor,parameter,value_hrf`,
//!   extra columns such as `value_raw` are ignored)
//! - the node metadata table (`node_id,description,address,lat,lon,
//!   start_timestamp,end_timestamp`)
//!
//! and joined on `node_id` into the denormalized [`Table`]. A measurement for
//! a node without metadata aborts the build with [`Error::MissingNode`].

use aot_common::{Error, NodeId, Result, Row, Table};
use chrono::{DateTime, NaiveDateTime, Timelike};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Timestamp layouts accepted in source files, tried in order.
/// `%.f` makes fractional seconds optional.
const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Last representable microsecond of a second, in nanoseconds.
const LAST_MICRO_NANOS: u32 = 999_999_000;

/// Parse a source timestamp. Precision is truncated to microseconds, the
/// resolution the cache stores. A leap second (`:60`) is folded into the
/// last microsecond of the preceding second.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    let parsed = TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
        .ok_or_else(|| Error::InvalidTimestamp {
            value: raw.to_string(),
        })?;
    let micros_only = ((parsed.nanosecond() / 1_000) * 1_000).min(LAST_MICRO_NANOS);
    parsed
        .with_nanosecond(micros_only)
        .ok_or_else(|| Error::InvalidTimestamp {
            value: raw.to_string(),
        })
}

#[derive(Debug, Deserialize)]
struct MeasurementRecord {
    timestamp: String,
    node_id: String,
    subsystem: String,
    sensor: String,
    parameter: String,
    value_hrf: String,
}

#[derive(Debug, Deserialize)]
struct NodeRecord {
    node_id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    address: String,
    #[serde(alias = "latitude")]
    lat: f64,
    #[serde(alias = "longitude")]
    lon: f64,
    #[serde(default)]
    start_timestamp: Option<String>,
    #[serde(default)]
    end_timestamp: Option<String>,
}

/// One reading from the measurement log, timestamp already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// 1-based line in the source file.
    pub line: u64,
    pub node_id: NodeId,
    pub timestamp: NaiveDateTime,
    pub subsystem: String,
    pub sensor: String,
    pub parameter: String,
    pub value_hrf: String,
}

/// Reference data for a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMetadata {
    pub node_id: NodeId,
    pub description: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl NodeMetadata {
    /// Whether the node was deployed at `ts`. Missing bounds are open.
    pub fn is_active_at(&self, ts: NaiveDateTime) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }
}

/// Node metadata keyed by node id.
pub type NodeIndex = HashMap<NodeId, NodeMetadata>;

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingSourceFile {
            path: path.to_path_buf(),
        })
    }
}

fn malformed(path: &Path, line: u64, reason: impl ToString) -> Error {
    Error::MalformedRecord {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}

/// Stream a headed CSV file through `visit`, one deserialized record at a time.
fn for_each_record<T, F>(path: &Path, mut visit: F) -> Result<()>
where
    T: DeserializeOwned,
    F: FnMut(u64, T) -> Result<()>,
{
    require_file(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| malformed(path, 0, e))?;
    let headers = reader.headers().map_err(|e| malformed(path, 1, e))?.clone();

    let mut record = StringRecord::new();
    loop {
        let more = reader.read_record(&mut record).map_err(|e| {
            let line = e.position().map_or(0, |p| p.line());
            malformed(path, line, e)
        })?;
        if !more {
            break;
        }
        let line = record.position().map_or(0, |p| p.line());
        let value: T = record
            .deserialize(Some(&headers))
            .map_err(|e| malformed(path, line, e))?;
        visit(line, value)?;
    }
    Ok(())
}

/// Read the node metadata table. Duplicate node ids are rejected.
pub fn read_nodes(path: &Path) -> Result<NodeIndex> {
    let mut index = NodeIndex::new();
    for_each_record(path, |line, rec: NodeRecord| {
        let node_id =
            NodeId::parse(&rec.node_id).ok_or_else(|| malformed(path, line, "empty node_id"))?;
        let start = rec.start_timestamp.as_deref().map(parse_timestamp).transpose()?;
        let end = rec.end_timestamp.as_deref().map(parse_timestamp).transpose()?;
        let meta = NodeMetadata {
            node_id: node_id.clone(),
            description: rec.description,
            address: rec.address,
            latitude: rec.lat,
            longitude: rec.lon,
            start,
            end,
        };
        if index.insert(node_id.clone(), meta).is_some() {
            return Err(Error::DuplicateNode {
                node_id: node_id.to_string(),
            });
        }
        Ok(())
    })?;
    debug!(path = %path.display(), nodes = index.len(), "node metadata read");
    Ok(index)
}

/// Read the measurement log.
pub fn read_measurements(path: &Path) -> Result<Vec<Measurement>> {
    let mut out = Vec::new();
    for_each_record(path, |line, rec: MeasurementRecord| {
        let node_id =
            NodeId::parse(&rec.node_id).ok_or_else(|| malformed(path, line, "empty node_id"))?;
        out.push(Measurement {
            line,
            node_id,
            timestamp: parse_timestamp(&rec.timestamp)?,
            subsystem: rec.subsystem,
            sensor: rec.sensor,
            parameter: rec.parameter,
            value_hrf: rec.value_hrf,
        });
        Ok(())
    })?;
    debug!(path = %path.display(), measurements = out.len(), "measurements read");
    Ok(out)
}

/// Attach node metadata to every measurement, preserving order.
pub fn join(measurements: Vec<Measurement>, nodes: &NodeIndex) -> Result<Table> {
    let mut rows = Vec::with_capacity(measurements.len());
    let mut inactive = 0usize;

    for m in measurements {
        let meta = nodes.get(&m.node_id).ok_or_else(|| Error::MissingNode {
            node_id: m.node_id.to_string(),
            line: m.line,
        })?;
        if !meta.is_active_at(m.timestamp) {
            inactive += 1;
        }
        rows.push(Row {
            date: m.timestamp.date(),
            time: m.timestamp.time(),
            node_id: m.node_id,
            latitude: meta.latitude,
            longitude: meta.longitude,
            address: meta.address.clone(),
            description: meta.description.clone(),
            subsystem: m.subsystem,
            sensor: m.sensor,
            parameter: m.parameter,
            value_hrf: m.value_hrf,
        });
    }

    if inactive > 0 {
        warn!(
            inactive,
            "measurements fall outside their node's activation window"
        );
    }
    Table::try_new(rows)
}

/// Read both source files and build the denormalized table.
pub fn build_table(measurements_path: &Path, nodes_path: &Path) -> Result<Table> {
    require_file(measurements_path)?;
    require_file(nodes_path)?;

    let started = Instant::now();
    info!(path = %nodes_path.display(), "reading node metadata");
    let nodes = read_nodes(nodes_path)?;
    info!(path = %measurements_path.display(), "reading measurements");
    let measurements = read_measurements(measurements_path)?;
    let table = join(measurements, &nodes)?;
    info!(
        rows = table.len(),
        nodes = nodes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "denormalized table built"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 8, 24)
            .unwrap()
            .and_hms_opt(8, 0, 5)
            .unwrap();
        for raw in [
            "2020/08/24 08:00:05",
            "2020-08-24 08:00:05",
            "2020-08-24T08:00:05",
            "2020-08-24T08:00:05+00:00",
            " 2020/08/24 08:00:05 ",
        ] {
            assert_eq!(parse_timestamp(raw).expect(raw), expected, "{raw}");
        }
    }

    #[test]
    fn test_parse_timestamp_truncates_to_micros() {
        let ts = parse_timestamp("2020-08-24 08:00:05.123456789").unwrap();
        assert_eq!(
            ts.time(),
            NaiveTime::from_hms_micro_opt(8, 0, 5, 123_456).unwrap()
        );
    }

    #[test]
    fn test_parse_timestamp_folds_leap_second() {
        let ts = parse_timestamp("2016/12/31 23:59:60").unwrap();
        assert_eq!(
            ts.time(),
            NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap()
        );
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2016, 12, 31).unwrap());

        let ts = parse_timestamp("2016-12-31T23:59:60.5").unwrap();
        assert_eq!(ts.time().nanosecond(), LAST_MICRO_NANOS);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp { value } if value == "yesterday"));
    }

    #[test]
    fn test_read_nodes_accepts_aliases_and_empty_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.csv");
        fs::write(
            &path,
            "node_id,project_id,vsn,address,latitude,longitude,description,start_timestamp,end_timestamp\n\
             001e0610ba46,AoT_Chicago,004,State St & Jackson Blvd,41.878,-87.627,AoT Chicago (S),2017/10/09 00:00:00,\n",
        )
        .unwrap();
        let nodes = read_nodes(&path).unwrap();
        let meta = &nodes["001e0610ba46"];
        assert_eq!(meta.address, "State St & Jackson Blvd");
        assert!((meta.latitude - 41.878).abs() < 1e-9);
        assert!(meta.start.is_some());
        assert!(meta.end.is_none());
    }

    #[test]
    fn test_read_nodes_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes.csv");
        fs::write(
            &path,
            "node_id,description,address,lat,lon\nN1,a,b,41.0,-87.0\nN1,c,d,41.1,-87.1\n",
        )
        .unwrap();
        let err = read_nodes(&path).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode { node_id } if node_id == "N1"));
    }

    #[test]
    fn test_malformed_record_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(
            &path,
            "timestamp,node_id,subsystem,sensor,parameter,value_raw,value_hrf\n\
             2020/08/24 00:00:03,N1,metsense,tsys01,temperature,2137,21.37\n\
             2020/08/24 00:00:04,N1,metsense\n",
        )
        .unwrap();
        let err = read_measurements(&path).unwrap_err();
        assert!(
            matches!(err, Error::MalformedRecord { line: 3, .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn test_join_missing_node_identifies_it() {
        let measurement = Measurement {
            line: 2,
            node_id: NodeId::from("N2"),
            timestamp: parse_timestamp("2020/08/24 08:00:00").unwrap(),
            subsystem: "metsense".into(),
            sensor: "tsys01".into(),
            parameter: "temperature".into(),
            value_hrf: "21.0".into(),
        };
        let err = join(vec![measurement], &NodeIndex::new()).unwrap_err();
        assert!(matches!(err, Error::MissingNode { node_id, line: 2 } if node_id == "N2"));
    }

    #[test]
    fn test_build_table_requires_both_sources() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data.csv");
        fs::write(&data, "timestamp,node_id,subsystem,sensor,parameter,value_hrf\n").unwrap();
        let err = build_table(&data, &dir.path().join("nodes.csv")).unwrap_err();
        assert!(matches!(err, Error::MissingSourceFile { path } if path.ends_with("nodes.csv")));
    }
}
