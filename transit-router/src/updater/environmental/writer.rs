//! Attach station readings to nearby street edges.

use std::collections::HashMap;

use tracing::debug;

use super::station::EnvironmentalStation;
use crate::domain::{EnvironmentalFactor, EnvironmentalFactorType};
use crate::graph::{EdgeId, Graph};

/// Streets within this distance of a station take its readings.
pub const DEFAULT_RADIUS_M: f64 = 100.0;

/// Graph writer applying one batch of stations.
#[derive(Debug, Clone)]
pub struct EnvironmentalWriter<T> {
    stations: Vec<T>,
    radius_m: f64,
}

impl<T: EnvironmentalStation> EnvironmentalWriter<T> {
    pub fn new(stations: Vec<T>) -> Self {
        Self {
            stations,
            radius_m: DEFAULT_RADIUS_M,
        }
    }

    pub fn with_radius_m(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    /// Replace the conditions of every street edge near a station. Edges with
    /// no nearby station keep what they had. Returns the number of edges
    /// updated.
    pub fn apply(&self, graph: &mut Graph) -> usize {
        let mut readings: HashMap<EdgeId, HashMap<EnvironmentalFactorType, Vec<f64>>> = HashMap::new();

        for station in self.stations.iter().filter(|s| s.has_measurements()) {
            let factors = station.factor_measurements();
            let edges = graph.street_edges_near(station.point(), self.radius_m);
            debug!(
                station = station.label(),
                edges = edges.len(),
                "matched station to streets"
            );
            for edge in edges {
                let per_type = readings.entry(edge).or_default();
                for factor in &factors {
                    per_type.entry(factor.factor_type).or_default().push(factor.value);
                }
            }
        }

        let updated = readings.len();
        for (edge, per_type) in readings {
            let mut factors: Vec<EnvironmentalFactor> = per_type
                .into_iter()
                .filter_map(|(factor_type, values)| EnvironmentalFactor::combine(factor_type, &values))
                .collect();
            factors.sort_by_key(|f| f.factor_type as u8);
            graph.set_conditions(edge, factors);
        }
        updated
    }
}
