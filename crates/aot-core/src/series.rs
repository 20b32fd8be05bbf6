//! Per-day time series for a fully narrowed selection.
//!
//! This is the data half of the dashboard's plot: one series per selected
//! day, x = time of day, y = reading (raw or smoothed). Rendering is left to
//! the caller.

use crate::filter::{filter_by_day, filter_by_node_id, filter_by_sensor_path};
use crate::options::{weekday_name, Selection};
use crate::processing::{moving_average, values};
use aot_common::Table;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::warn;

/// How readings are turned into y values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Smoothing {
    Raw,
    MovingAverage { window: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: NaiveTime,
    /// `None` where the reading is not numeric or the smoothing window is
    /// not yet full.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySeries {
    pub date: NaiveDate,
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plot {
    pub title: String,
    pub y_label: String,
    pub smoothing: Smoothing,
    pub series: Vec<DaySeries>,
}

impl Plot {
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

/// Distinct days, ascending, capped at `max_panels`.
fn panel_days(days: &[NaiveDate], max_panels: usize) -> Vec<NaiveDate> {
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();
    days.truncate(max_panels.max(1));
    days
}

/// Build the plot for `selection` over `days`.
///
/// Days without readings produce empty series rather than errors.
pub fn build_plot(
    table: &Table,
    selection: &Selection,
    days: &[NaiveDate],
    smoothing: Smoothing,
    max_panels: usize,
) -> Plot {
    let narrowed = match selection.node_id.as_deref() {
        Some(node) => filter_by_node_id(table, node),
        None => table.clone(),
    };
    let narrowed = filter_by_sensor_path(&narrowed, &selection.sensor_path());

    let series = panel_days(days, max_panels)
        .into_iter()
        .map(|date| {
            let day = filter_by_day(&narrowed, date);
            let raw = values(&day);
            let non_numeric = raw.iter().filter(|v| v.is_none()).count();
            if non_numeric > 0 {
                warn!(%date, non_numeric, "readings without a numeric value");
            }
            let ys = match smoothing {
                Smoothing::Raw => raw,
                Smoothing::MovingAverage { window } => moving_average(&raw, window),
            };
            DaySeries {
                date,
                label: weekday_name(date).to_string(),
                points: day
                    .iter()
                    .zip(ys)
                    .map(|(row, value)| SeriesPoint {
                        time: row.time,
                        value,
                    })
                    .collect(),
            }
        })
        .collect();

    let y_label = selection
        .parameter
        .clone()
        .unwrap_or_else(|| "value".to_string());
    Plot {
        title: format!("{y_label} Over Time"),
        y_label,
        smoothing,
        series,
    }
}
