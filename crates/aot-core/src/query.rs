//! Composed drill-down over the filter primitives.

use crate::filter::{
    filter_by_date_range, filter_by_day, filter_by_days, filter_by_node_id,
    filter_by_sensor_path, filter_by_time, SensorPath,
};
use aot_common::{NodeId, Table};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::debug;

/// A drill-down request: node, then sensor path, then days or a date range,
/// then a time-of-day window. Unset stages pass every row through.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Query {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub path: SensorPath,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<(NaiveDateTime, NaiveDateTime)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<(NaiveTime, NaiveTime)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node_id: impl Into<NodeId>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn path(mut self, path: SensorPath) -> Self {
        self.path = path;
        self
    }

    pub fn day(mut self, day: NaiveDate) -> Self {
        if !self.days.contains(&day) {
            self.days.push(day);
        }
        self
    }

    pub fn date_range(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.date_range = Some((start, end));
        self
    }

    pub fn time_range(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.time_range = Some((start, end));
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.node_id.is_none()
            && self.path.is_unconstrained()
            && self.days.is_empty()
            && self.date_range.is_none()
            && self.time_range.is_none()
    }

    /// Run every set stage against `table`, narrowest-first.
    pub fn apply(&self, table: &Table) -> Table {
        if self.is_unconstrained() {
            return table.clone();
        }

        let mut out = match &self.node_id {
            Some(id) => filter_by_node_id(table, id.as_str()),
            None => table.clone(),
        };
        out = filter_by_sensor_path(&out, &self.path);
        out = match self.days.as_slice() {
            [] => out,
            [day] => filter_by_day(&out, *day),
            days => filter_by_days(&out, days),
        };
        if let Some((start, end)) = self.date_range {
            out = filter_by_date_range(&out, start, end);
        }
        if let Some((start, end)) = self.time_range {
            out = filter_by_time(&out, start, end);
        }

        debug!(input = table.len(), output = out.len(), "query applied");
        out
    }
}
