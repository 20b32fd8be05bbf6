//! Row selection primitives over the denormalized table.
//!
//! Every function here is pure: it reads the input table and returns a new
//! one holding the matching rows in their original order, with all columns.
//! An empty result is a normal outcome. Filters compose by feeding one's
//! output into the next, mirroring the dashboard's node → subsystem →
//! sensor → parameter → day drill-down.

use aot_common::{Row, Table};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Rows recorded on `day`.
pub fn filter_by_day(table: &Table, day: NaiveDate) -> Table {
    table.filter(|r| r.date == day)
}

/// Rows recorded on any of `days`.
pub fn filter_by_days(table: &Table, days: &[NaiveDate]) -> Table {
    table.filter(|r| days.contains(&r.date))
}

/// Rows whose time of day lies in `[start, end]`. Both ends are inclusive;
/// `start > end` selects nothing.
pub fn filter_by_time(table: &Table, start: NaiveTime, end: NaiveTime) -> Table {
    table.filter(|r| start <= r.time && r.time <= end)
}

/// Rows whose date lies in `[start.date(), end.date()]`. The time-of-day
/// parts of the bounds are ignored.
pub fn filter_by_date_range(table: &Table, start: NaiveDateTime, end: NaiveDateTime) -> Table {
    let (first, last) = (start.date(), end.date());
    table.filter(|r| first <= r.date && r.date <= last)
}

/// Rows reported by node `node_id` (exact match).
pub fn filter_by_node_id(table: &Table, node_id: &str) -> Table {
    table.filter(|r| r.node_id.as_str() == node_id)
}

/// Rows matching every field of `path` that is set.
///
/// With no field set the input is returned unchanged.
pub fn filter_by_sensor_path(table: &Table, path: &SensorPath) -> Table {
    if path.is_unconstrained() {
        return table.clone();
    }
    table.filter(|r| path.matches(r))
}

/// A partial `subsystem/sensor/parameter` address. Unset levels match
/// anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl SensorPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    pub fn sensor(mut self, sensor: impl Into<String>) -> Self {
        self.sensor = Some(sensor.into());
        self
    }

    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.subsystem.is_none() && self.sensor.is_none() && self.parameter.is_none()
    }

    pub fn matches(&self, row: &Row) -> bool {
        fn level(want: &Option<String>, have: &str) -> bool {
            want.as_deref().map_or(true, |w| w == have)
        }
        level(&self.subsystem, &row.subsystem)
            && level(&self.sensor, &row.sensor)
            && level(&self.parameter, &row.parameter)
    }
}

impl std::fmt::Display for SensorPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let part = |p: &Option<String>| p.clone().unwrap_or_else(|| "*".to_string());
        write!(
            f,
            "{}/{}/{}",
            part(&self.subsystem),
            part(&self.sensor),
            part(&self.parameter)
        )
    }
}
