//! Cascading selection options derived from the table.
//!
//! The dashboard narrows a selection node → subsystem → sensor → parameter;
//! each level's choices are whatever the filter chain above it leaves.
//! Nothing here is stored between requests: a [`Selection`] carries the
//! whole context.

use crate::filter::{filter_by_node_id, filter_by_sensor_path, SensorPath};
use aot_common::Table;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// One entry of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

impl DropdownOption {
    fn same(value: &str) -> Self {
        Self {
            label: value.to_string(),
            value: value.to_string(),
        }
    }
}

fn to_options(values: Vec<&str>) -> Vec<DropdownOption> {
    values.into_iter().map(DropdownOption::same).collect()
}

/// Every node id, in order of first appearance.
pub fn node_options(table: &Table) -> Vec<DropdownOption> {
    table
        .node_ids()
        .into_iter()
        .map(|id| DropdownOption::same(id.as_str()))
        .collect()
}

/// Subsystems reported by `node_id`.
pub fn subsystem_options(table: &Table, node_id: &str) -> Vec<DropdownOption> {
    to_options(filter_by_node_id(table, node_id).distinct(|r| r.subsystem.as_str()))
}

/// Sensors of `subsystem` on `node_id`.
pub fn sensor_options(table: &Table, node_id: &str, subsystem: &str) -> Vec<DropdownOption> {
    let rows = filter_by_sensor_path(
        &filter_by_node_id(table, node_id),
        &SensorPath::new().subsystem(subsystem),
    );
    to_options(rows.distinct(|r| r.sensor.as_str()))
}

/// Parameters of `subsystem/sensor` on `node_id`.
pub fn parameter_options(
    table: &Table,
    node_id: &str,
    subsystem: &str,
    sensor: &str,
) -> Vec<DropdownOption> {
    let rows = filter_by_sensor_path(
        &filter_by_node_id(table, node_id),
        &SensorPath::new().subsystem(subsystem).sensor(sensor),
    );
    to_options(rows.distinct(|r| r.parameter.as_str()))
}

/// A calendar day present in the data, labelled by weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayOption {
    pub label: String,
    pub date: NaiveDate,
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Each distinct date in the table, ascending.
pub fn day_options(table: &Table) -> Vec<DayOption> {
    table
        .dates()
        .into_iter()
        .map(|date| DayOption {
            label: weekday_name(date).to_string(),
            date,
        })
        .collect()
}

/// A possibly partial choice at each dropdown level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl Selection {
    pub fn sensor_path(&self) -> SensorPath {
        SensorPath {
            subsystem: self.subsystem.clone(),
            sensor: self.sensor.clone(),
            parameter: self.parameter.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.node_id.is_some()
            && self.subsystem.is_some()
            && self.sensor.is_some()
            && self.parameter.is_some()
    }
}

/// Options at every level plus the resolved selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cascade {
    pub nodes: Vec<DropdownOption>,
    pub subsystems: Vec<DropdownOption>,
    pub sensors: Vec<DropdownOption>,
    pub parameters: Vec<DropdownOption>,
    pub selection: Selection,
}

fn pick(requested: &Option<String>, options: &[DropdownOption]) -> Option<String> {
    requested
        .clone()
        .or_else(|| options.first().map(|o| o.value.clone()))
}

/// Fill in a partial selection level by level.
///
/// A level the caller set is kept as given (an unknown value simply yields
/// no options below it); an unset level defaults to its first option.
pub fn cascade(table: &Table, requested: &Selection) -> Cascade {
    let nodes = node_options(table);
    let node_id = pick(&requested.node_id, &nodes);

    let subsystems = node_id
        .as_deref()
        .map(|n| subsystem_options(table, n))
        .unwrap_or_default();
    let subsystem = pick(&requested.subsystem, &subsystems);

    let sensors = match (node_id.as_deref(), subsystem.as_deref()) {
        (Some(n), Some(s)) => sensor_options(table, n, s),
        _ => Vec::new(),
    };
    let sensor = pick(&requested.sensor, &sensors);

    let parameters = match (node_id.as_deref(), subsystem.as_deref(), sensor.as_deref()) {
        (Some(n), Some(s), Some(x)) => parameter_options(table, n, s, x),
        _ => Vec::new(),
    };
    let parameter = pick(&requested.parameter, &parameters);

    Cascade {
        nodes,
        subsystems,
        sensors,
        parameters,
        selection: Selection {
            node_id,
            subsystem,
            sensor,
            parameter,
        },
    }
}
