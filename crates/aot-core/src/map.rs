//! Node location markers for the map view.

use crate::filter::filter_by_node_id;
use aot_common::Table;
use aot_config::MapView;
use serde::Serialize;

/// One map marker per node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMarker {
    pub node_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub description: String,
    /// Subsystems the node reports, in order of first appearance.
    pub subsystems: Vec<String>,
    /// Marker size grows with the number of reporting subsystems.
    pub size: u32,
    pub color: String,
}

/// Markers plus the initial viewport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMap {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub zoom: f64,
    pub markers: Vec<NodeMarker>,
}

fn marker_size(subsystems: usize) -> u32 {
    u32::try_from(subsystems)
        .unwrap_or(u32::MAX)
        .saturating_mul(10)
        .saturating_add(10)
}

/// Build one marker per node present in `table`.
pub fn node_markers(table: &Table, view: &MapView) -> Vec<NodeMarker> {
    table
        .node_ids()
        .into_iter()
        .filter_map(|id| {
            let rows = filter_by_node_id(table, id.as_str());
            let first = rows.first()?;
            let subsystems: Vec<String> = rows
                .distinct(|r| r.subsystem.as_str())
                .into_iter()
                .map(str::to_string)
                .collect();
            Some(NodeMarker {
                node_id: id.to_string(),
                latitude: first.latitude,
                longitude: first.longitude,
                address: first.address.clone(),
                description: first.description.clone(),
                size: marker_size(subsystems.len()),
                subsystems,
                color: view.color_for(id.as_str()).to_string(),
            })
        })
        .collect()
}

pub fn node_map(table: &Table, view: &MapView) -> NodeMap {
    NodeMap {
        center_latitude: view.center_latitude,
        center_longitude: view.center_longitude,
        zoom: view.zoom,
        markers: node_markers(table, view),
    }
}
