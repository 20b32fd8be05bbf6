//! Arrow schema for the denormalized measurement table.
//!
//! Column order and names match [`aot_common::COLUMNS`]. Dates are stored as
//! `Date32` (days since the Unix epoch) and times of day as
//! `Time64(Microsecond)`; every column is non-nullable.

use crate::cache::StoreError;
use aot_common::{NodeId, Row, Table, COLUMNS};
use arrow::array::{
    Array, ArrayRef, Date32Array, Float64Array, StringArray, Time64MicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use std::sync::Arc;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Arrow schema of the denormalized table.
pub fn table_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(COLUMNS[0], DataType::Date32, false),
        Field::new(COLUMNS[1], DataType::Time64(TimeUnit::Microsecond), false),
        Field::new(COLUMNS[2], DataType::Utf8, false),
        Field::new(COLUMNS[3], DataType::Float64, false),
        Field::new(COLUMNS[4], DataType::Float64, false),
        Field::new(COLUMNS[5], DataType::Utf8, false),
        Field::new(COLUMNS[6], DataType::Utf8, false),
        Field::new(COLUMNS[7], DataType::Utf8, false),
        Field::new(COLUMNS[8], DataType::Utf8, false),
        Field::new(COLUMNS[9], DataType::Utf8, false),
        Field::new(COLUMNS[10], DataType::Utf8, false),
    ]))
}

fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

fn time_to_micros(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * MICROS_PER_SECOND
        + i64::from(time.nanosecond() / 1_000)
}

fn micros_to_time(micros: i64) -> Option<NaiveTime> {
    if micros < 0 {
        return None;
    }
    let secs = u32::try_from(micros / MICROS_PER_SECOND).ok()?;
    let nanos = u32::try_from((micros % MICROS_PER_SECOND) * 1_000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

fn strings<'a>(rows: &'a [Row], column: impl Fn(&'a Row) -> &'a str) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(column).collect::<Vec<_>>()))
}

/// Convert rows to a single record batch with [`table_schema`].
pub fn encode_batch(rows: &[Row]) -> Result<RecordBatch, StoreError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(
            rows.iter().map(|r| date_to_days(r.date)).collect::<Vec<_>>(),
        )),
        Arc::new(Time64MicrosecondArray::from(
            rows.iter().map(|r| time_to_micros(r.time)).collect::<Vec<_>>(),
        )),
        strings(rows, |r| r.node_id.as_str()),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.latitude).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.longitude).collect::<Vec<_>>(),
        )),
        strings(rows, |r| r.address.as_str()),
        strings(rows, |r| r.description.as_str()),
        strings(rows, |r| r.subsystem.as_str()),
        strings(rows, |r| r.sensor.as_str()),
        strings(rows, |r| r.parameter.as_str()),
        strings(rows, |r| r.value_hrf.as_str()),
    ];
    RecordBatch::try_new(table_schema(), columns).map_err(|e| StoreError::Write(e.to_string()))
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, StoreError> {
    let array = batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::Corrupted(format!("missing column {name}")))?;
    if array.null_count() > 0 {
        return Err(StoreError::Corrupted(format!("column {name} contains nulls")));
    }
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        StoreError::Corrupted(format!(
            "column {name} has unexpected type {}",
            array.data_type()
        ))
    })
}

/// Convert a record batch read from the cache back into rows, appending to
/// `out`.
pub fn decode_batch(batch: &RecordBatch, out: &mut Vec<Row>) -> Result<(), StoreError> {
    let date = column::<Date32Array>(batch, "date")?;
    let time = column::<Time64MicrosecondArray>(batch, "time")?;
    let node_id = column::<StringArray>(batch, "node_id")?;
    let latitude = column::<Float64Array>(batch, "latitude")?;
    let longitude = column::<Float64Array>(batch, "longitude")?;
    let address = column::<StringArray>(batch, "address")?;
    let description = column::<StringArray>(batch, "description")?;
    let subsystem = column::<StringArray>(batch, "subsystem")?;
    let sensor = column::<StringArray>(batch, "sensor")?;
    let parameter = column::<StringArray>(batch, "parameter")?;
    let value_hrf = column::<StringArray>(batch, "value_hrf")?;

    out.reserve(batch.num_rows());
    for i in 0..batch.num_rows() {
        let days = date.value(i);
        let micros = time.value(i);
        out.push(Row {
            date: days_to_date(days)
                .ok_or_else(|| StoreError::Corrupted(format!("row {i}: invalid date {days}")))?,
            time: micros_to_time(micros)
                .ok_or_else(|| StoreError::Corrupted(format!("row {i}: invalid time {micros}")))?,
            node_id: NodeId::from(node_id.value(i)),
            latitude: latitude.value(i),
            longitude: longitude.value(i),
            address: address.value(i).to_string(),
            description: description.value(i).to_string(),
            subsystem: subsystem.value(i).to_string(),
            sensor: sensor.value(i).to_string(),
            parameter: parameter.value(i).to_string(),
            value_hrf: value_hrf.value(i).to_string(),
        });
    }
    Ok(())
}

/// Render up to `limit` rows of a table as an ASCII grid.
pub fn pretty_format(table: &Table, limit: usize) -> Result<String, StoreError> {
    let rows = &table.rows()[..table.len().min(limit)];
    let batch = encode_batch(rows).map_err(|e| StoreError::Render(e.to_string()))?;
    let formatted =
        pretty_format_batches(&[batch]).map_err(|e| StoreError::Render(e.to_string()))?;
    Ok(formatted.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_conversion_epoch() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_days(epoch), 0);
        let d = NaiveDate::from_ymd_opt(2020, 8, 24).unwrap();
        assert_eq!(days_to_date(date_to_days(d)), Some(d));
    }

    #[test]
    fn test_time_conversion_keeps_micros() {
        let t = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap();
        assert_eq!(micros_to_time(time_to_micros(t)), Some(t));
        assert_eq!(micros_to_time(-1), None);
        assert_eq!(micros_to_time(86_400 * MICROS_PER_SECOND), None);
    }

    #[test]
    fn test_schema_matches_columns() {
        let schema = table_schema();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, COLUMNS.to_vec());
    }

    #[test]
    fn test_decode_rejects_wrong_type() {
        let schema = Arc::new(Schema::new(vec![Field::new("date", DataType::Utf8, false)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec!["2020-08-24"])) as ArrayRef],
        )
        .unwrap();
        let mut out = Vec::new();
        let err = decode_batch(&batch, &mut out).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted(msg) if msg.contains("date")));
    }
}
