use std::collections::HashMap;

use log::debug;
use proximity_divergence::{Coordinates, GeoRecord, RecordId};
use snafu::prelude::*;

use crate::pipeline::io_pairs::{PairRow, PairRowEndpoint};
use crate::pipeline::*;

/// Label of a marker whose original percentage is unknown.
pub const NOT_AVAILABLE: &str = "N/A";
pub const DEFAULT_ZOOM: u8 = 10;
pub const DEFAULT_LAYER_NAME: &str = "Address Pairs";

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct MapSettings {
    pub zoom: u8,
    pub layer_name: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        MapSettings {
            zoom: DEFAULT_ZOOM,
            layer_name: DEFAULT_LAYER_NAME.to_string(),
        }
    }
}

// -0.0 and 0.0 are the same position.
fn position_key(c: &Coordinates) -> (u64, u64) {
    ((c.latitude + 0.0).to_bits(), (c.longitude + 0.0).to_bits())
}

/// Finds the original percentage of a pair endpoint.
pub struct PercentageIndex {
    by_id: HashMap<RecordId, (Coordinates, f64)>,
    by_position: HashMap<(u64, u64), f64>,
}

impl PercentageIndex {
    pub fn new(records: &[GeoRecord]) -> PercentageIndex {
        let mut by_id = HashMap::new();
        let mut by_position = HashMap::new();
        for r in records.iter() {
            by_id.insert(r.id, (r.coordinates, r.percentage));
            // The first record at a position wins.
            by_position
                .entry(position_key(&r.coordinates))
                .or_insert(r.percentage);
        }
        PercentageIndex { by_id, by_position }
    }

    /// The percentage, as a fraction. The id is trusted only when the record
    /// it names is at the same position; otherwise the position decides.
    pub fn lookup(&self, endpoint: &PairRowEndpoint) -> Option<f64> {
        let by_id = endpoint
            .id
            .and_then(|id| self.by_id.get(&id))
            .filter(|(c, _)| c.same_position(&endpoint.coordinates))
            .map(|(_, pct)| *pct);
        by_id.or_else(|| {
            self.by_position
                .get(&position_key(&endpoint.coordinates))
                .copied()
        })
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Marker {
    pub position: Coordinates,
    pub label: String,
    /// False when the label is [NOT_AVAILABLE].
    pub matched: bool,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Connector {
    pub from: Coordinates,
    pub to: Coordinates,
    pub tooltip: Vec<String>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
    pub layer_name: String,
    pub markers: Vec<Marker>,
    pub connectors: Vec<Connector>,
}

fn marker(endpoint: &PairRowEndpoint, index: &PercentageIndex) -> Marker {
    match index.lookup(endpoint) {
        Some(pct) => Marker {
            position: endpoint.coordinates,
            label: format!("{:.1}%", pct * 100.0),
            matched: true,
        },
        None => Marker {
            position: endpoint.coordinates,
            label: NOT_AVAILABLE.to_string(),
            matched: false,
        },
    }
}

/// Lays out the map: one marker per endpoint and one line per pair, centered on
/// the mean of all the endpoints.
pub fn build_map_view(
    pairs: &[PairRow],
    index: &PercentageIndex,
    settings: &MapSettings,
) -> PipelineResult<MapView> {
    ensure!(!pairs.is_empty(), NoValidPairsSnafu {});

    let positions: Vec<Coordinates> = pairs
        .iter()
        .flat_map(|p| [p.first.coordinates, p.second.coordinates])
        .collect();
    let lats: Vec<f64> = positions
        .iter()
        .map(|c| c.latitude)
        .filter(|x| x.is_finite())
        .collect();
    let lons: Vec<f64> = positions
        .iter()
        .map(|c| c.longitude)
        .filter(|x| x.is_finite())
        .collect();
    ensure!(
        !lats.is_empty() && !lons.is_empty(),
        NoValidCoordinatesSnafu {}
    );
    let center = Coordinates::new(
        lats.iter().sum::<f64>() / lats.len() as f64,
        lons.iter().sum::<f64>() / lons.len() as f64,
    );
    debug!("build_map_view: center: {:?}", center);

    let mut markers: Vec<Marker> = Vec::with_capacity(2 * pairs.len());
    let mut connectors: Vec<Connector> = Vec::with_capacity(pairs.len());
    for pair in pairs.iter() {
        markers.push(marker(&pair.first, index));
        markers.push(marker(&pair.second, index));
        connectors.push(Connector {
            from: pair.first.coordinates,
            to: pair.second.coordinates,
            tooltip: vec![
                format!("Distance: {:.1} km", pair.distance_km),
                format!("Percentage Difference: {:.1}%", pair.percentage_diff),
            ],
        });
    }

    Ok(MapView {
        center,
        zoom: settings.zoom,
        layer_name: settings.layer_name.clone(),
        markers,
        connectors,
    })
}
