//! Environmental updater: polls an air-quality or noise source and writes
//! the readings onto nearby street edges.

mod fetch;
mod madrid;
mod noise;
mod openaq;
mod station;
mod writer;

pub use madrid::{MadridNoiseDataSource, MomentOfDay};
pub use noise::{NoiseMeasurement, NoiseStation, ParameterNoise};
pub use openaq::OpenAqDataSource;
pub use station::{AirStation, EnvironmentalStation, ParameterAir, StationMeasurement};
pub use writer::{DEFAULT_RADIUS_M, EnvironmentalWriter};

use std::future::Future;

use tracing::debug;

use super::error::UpdaterError;
use super::manager::WriterHandle;
use super::polling::PollingGraphUpdater;

/// A feed of environmental stations.
pub trait EnvironmentalDataSource: Send + 'static {
    type Station: EnvironmentalStation;

    /// Fetch the feed. Returns false when nothing new was loaded; failures
    /// are logged.
    fn update(&mut self) -> impl Future<Output = bool> + Send;

    /// Stations from the last successful update.
    fn stations(&self) -> &[Self::Station];
}

/// Polling updater over an [`EnvironmentalDataSource`].
#[derive(Debug)]
pub struct EnvironmentalUpdater<S> {
    name: String,
    source: S,
    radius_m: f64,
}

impl<S: EnvironmentalDataSource> EnvironmentalUpdater<S> {
    pub fn new(name: impl Into<String>, source: S) -> Self {
        Self {
            name: name.into(),
            source,
            radius_m: DEFAULT_RADIUS_M,
        }
    }

    pub fn with_radius_m(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: EnvironmentalDataSource> PollingGraphUpdater for EnvironmentalUpdater<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_polling(&mut self, writer: &WriterHandle) -> Result<(), UpdaterError> {
        if !self.source.update().await {
            debug!(updater = %self.name, "no updates");
            return Ok(());
        }
        let job = EnvironmentalWriter::new(self.source.stations().to_vec()).with_radius_m(self.radius_m);
        writer
            .execute(move |graph| {
                let updated = job.apply(graph);
                debug!(edges = updated, "applied environmental readings");
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::calendar::ServiceCalendar;
    use crate::domain::{EnvironmentalFactorType, TraverseModeSet};
    use crate::graph::{EdgeId, Graph, GraphBuilder};
    use crate::updater::{GraphUpdaterManager, PollingUpdater};

    const FEED: &str = r#"{"results": [{
        "location": "plaza",
        "city": "Madrid",
        "country": "ES",
        "measurements": [
            {"parameter": "no2", "value": 40, "lastUpdated": "2024-05-01T10:00:00Z"}
        ],
        "coordinates": {"latitude": 40.4105, "longitude": -3.695}
    }]}"#;

    fn graph() -> (Graph, EdgeId) {
        let mut b = GraphBuilder::new(ServiceCalendar::new(chrono_tz::UTC));
        let w = b.add_street_vertex("w", -3.7000, 40.4100).unwrap();
        let e = b.add_street_vertex("e", -3.6900, 40.4100).unwrap();
        let street = b
            .add_street(w, e, "Gran Via", None, TraverseModeSet::walk_and_transit(), false)
            .unwrap();
        (b.build(), street[0])
    }

    fn cut_off() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn readings_reach_the_published_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        std::fs::write(&path, FEED).unwrap();

        let (graph, street) = graph();
        let manager = GraphUpdaterManager::new(graph);
        let source = OpenAqDataSource::new(path.display().to_string(), None)
            .unwrap()
            .with_cut_off(cut_off());
        let updater = EnvironmentalUpdater::new("air", source);

        let updater = PollingUpdater::new(updater, 0).run(manager.handle()).await;
        assert_eq!(updater.source().stations().len(), 1);
        manager.execute_and_wait(|_| {}).await.unwrap();

        let published = manager.graph();
        let factors = published.conditions(street);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].factor_type, EnvironmentalFactorType::Pollution);
        assert_eq!(factors[0].average, 20.0);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn failed_source_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (graph, street) = graph();
        let manager = GraphUpdaterManager::new(graph);
        let source = OpenAqDataSource::new(dir.path().join("missing.json").display().to_string(), None)
            .unwrap();
        let mut updater = EnvironmentalUpdater::new("air", source);

        updater.run_polling(&manager.handle()).await.unwrap();
        manager.execute_and_wait(|_| {}).await.unwrap();
        assert!(manager.graph().conditions(street).is_empty());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn noise_levels_reach_the_published_graph() {
        let dir = tempfile::tempdir().unwrap();
        let positions = dir.path().join("estaciones.csv");
        let levels = dir.path().join("ruido.txt");
        std::fs::write(
            &positions,
            "ESTACIONES;;;;\nN;Nombre;Direccion;Longitud;Latitud\n\
             1;Recoletos;Almirante;3º41'27'' O;40º25'24'' N\n",
        )
        .unwrap();
        std::fs::write(&levels, "001,2017,11,09,N,60,70,65,58,52,49\n").unwrap();

        let mut b = GraphBuilder::new(ServiceCalendar::new(chrono_tz::UTC));
        let w = b.add_street_vertex("w", -3.6920, 40.4233).unwrap();
        let e = b.add_street_vertex("e", -3.6900, 40.4233).unwrap();
        let street = b
            .add_street(w, e, "Paseo de Recoletos", None, TraverseModeSet::walk_and_transit(), false)
            .unwrap()[0];
        let manager = GraphUpdaterManager::new(b.build());

        let source = MadridNoiseDataSource::new(
            positions.display().to_string(),
            levels.display().to_string(),
            None,
        )
        .unwrap()
        .at_time_of_day(chrono::NaiveTime::from_hms_opt(2, 0, 0).unwrap());
        let mut updater = EnvironmentalUpdater::new("noise", source);
        updater.run_polling(&manager.handle()).await.unwrap();
        manager.execute_and_wait(|_| {}).await.unwrap();

        let published = manager.graph();
        let factors = published.conditions(street);
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].factor_type, EnvironmentalFactorType::Noise);
        assert_eq!(factors[0].average, 59.0);
        manager.shutdown().await;
    }
}
