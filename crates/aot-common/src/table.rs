//! The denormalized measurement table.
//!
//! One [`Row`] per sensor reading, with the owning node's location and
//! description attached. A [`Table`] is built once (by the loader or from the
//! cache) and never mutated afterwards; every selection derives a new table
//! through [`Table::filter`], which preserves row order.

use crate::error::{Error, Result};
use crate::id::NodeId;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single measurement joined with its node metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub node_id: NodeId,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub description: String,
    pub subsystem: String,
    pub sensor: String,
    pub parameter: String,
    /// Human-readable value as reported by the node. Usually numeric, but
    /// some sensors report text (e.g. `"NA"`).
    pub value_hrf: String,
}

impl Row {
    /// Reassemble the measurement timestamp.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Numeric value, if `value_hrf` parses as a finite number.
    pub fn value(&self) -> Option<f64> {
        self.value_hrf
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.node_id.as_str().trim().is_empty() {
            return Err(Error::SchemaValidation(format!("row {index}: empty node_id")));
        }
        if self.time.nanosecond() >= 1_000_000_000 {
            return Err(Error::SchemaValidation(format!(
                "row {index}: leap-second time {} for node {}",
                self.time, self.node_id
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::SchemaValidation(format!(
                "row {index}: latitude {} out of range for node {}",
                self.latitude, self.node_id
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::SchemaValidation(format!(
                "row {index}: longitude {} out of range for node {}",
                self.longitude, self.node_id
            )));
        }
        Ok(())
    }
}

/// Immutable, order-preserving collection of [`Row`]s with a fixed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// Build a table, validating every row against the schema.
    pub fn try_new(rows: Vec<Row>) -> Result<Self> {
        for (index, row) in rows.iter().enumerate() {
            row.validate(index)?;
        }
        Ok(Self { rows })
    }

    /// A table with no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Derive a new table holding the rows matching `predicate`, in order.
    pub fn filter<F>(&self, mut predicate: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        Table {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Distinct values of a column, in order of first appearance.
    pub fn distinct<'a, F>(&'a self, column: F) -> Vec<&'a str>
    where
        F: Fn(&'a Row) -> &'a str,
    {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(column)
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// Distinct node ids, in order of first appearance.
    pub fn node_ids(&self) -> Vec<&NodeId> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| &r.node_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Distinct dates, sorted ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.rows.iter().map(|r| r.date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Earliest and latest date present, if any.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some((min, max))
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
