//! OpenAQ air-quality feed.
//!
//! The feed is the OpenAQ v1 `latest` response: a `results` array of
//! locations, each with coordinates and a list of latest measurements.

use chrono::{DateTime, TimeDelta, Utc};
use geo::Point;
use serde::Deserialize;
use tracing::{debug, warn};

use super::EnvironmentalDataSource;
use super::fetch::{fetch, http_client};
use super::station::{AirStation, ParameterAir, StationMeasurement};
use crate::updater::error::{ConfigError, SourceError};

/// Measurements older than this are ignored unless a cut-off is given.
const DEFAULT_MAX_AGE: TimeDelta = TimeDelta::hours(24);

#[derive(Debug, Deserialize)]
struct OpenAqResponse {
    results: Vec<LocationDto>,
}

#[derive(Debug, Deserialize)]
struct LocationDto {
    #[serde(default)]
    location: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    measurements: Vec<MeasurementDto>,
    coordinates: Option<CoordinatesDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeasurementDto {
    parameter: Option<String>,
    value: Option<f64>,
    last_updated: Option<String>,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    source_name: String,
}

#[derive(Debug, Deserialize)]
struct CoordinatesDto {
    latitude: f64,
    longitude: f64,
}

/// Pollution data from an OpenAQ URL or a local JSON file.
#[derive(Debug)]
pub struct OpenAqDataSource {
    url: String,
    http: reqwest::Client,
    cut_off: Option<DateTime<Utc>>,
    stations: Vec<AirStation>,
}

impl OpenAqDataSource {
    /// Create a source for `url`. URLs that are not http(s) are read as
    /// local paths, with an optional `file://` prefix.
    pub fn new(url: impl Into<String>, header: Option<(&str, &str)>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: url.into(),
            http: http_client(header)?,
            cut_off: None,
            stations: Vec::new(),
        })
    }

    /// Only keep measurements updated after `cut_off` instead of the last 24
    /// hours.
    pub fn with_cut_off(mut self, cut_off: DateTime<Utc>) -> Self {
        self.cut_off = Some(cut_off);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn load(&self) -> Result<Vec<AirStation>, SourceError> {
        let body = fetch(&self.http, &self.url).await?;
        let cut_off = self.cut_off.unwrap_or_else(|| Utc::now() - DEFAULT_MAX_AGE);
        parse_stations(&body, cut_off)
    }
}

impl EnvironmentalDataSource for OpenAqDataSource {
    type Station = AirStation;

    async fn update(&mut self) -> bool {
        match self.load().await {
            Ok(stations) => {
                debug!(url = %self.url, stations = stations.len(), "loaded air-quality stations");
                self.stations = stations;
                true
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "failed to load air-quality feed");
                false
            }
        }
    }

    fn stations(&self) -> &[AirStation] {
        &self.stations
    }
}

/// Parse an OpenAQ response, keeping measurements newer than `cut_off`.
/// Locations without coordinates and incomplete or unknown measurements are
/// skipped.
fn parse_stations(body: &[u8], cut_off: DateTime<Utc>) -> Result<Vec<AirStation>, SourceError> {
    let response: OpenAqResponse = serde_json::from_slice(body)?;
    let stations = response
        .results
        .into_iter()
        .filter_map(|location| {
            let coordinates = location.coordinates?;
            let measurements = location
                .measurements
                .into_iter()
                .filter_map(|m| measurement(m, cut_off))
                .collect();
            Some(AirStation {
                location: location.location,
                city: location.city,
                country: location.country,
                measurements,
                point: Point::new(coordinates.longitude, coordinates.latitude),
            })
        })
        .collect();
    Ok(stations)
}

fn measurement(dto: MeasurementDto, cut_off: DateTime<Utc>) -> Option<StationMeasurement> {
    let (Some(parameter), Some(value), Some(last_updated)) = (dto.parameter, dto.value, dto.last_updated)
    else {
        return None;
    };
    let parameter = match parameter.parse::<ParameterAir>() {
        Ok(parameter) => parameter,
        Err(unknown) => {
            debug!(parameter = %unknown, "skipping unknown air parameter");
            return None;
        }
    };
    let last_updated = DateTime::parse_from_rfc3339(&last_updated)
        .ok()?
        .with_timezone(&Utc);
    if last_updated <= cut_off {
        return None;
    }
    Some(StationMeasurement {
        parameter,
        value,
        last_updated,
        unit: dto.unit,
        source_name: dto.source_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{
        "meta": {"name": "openaq-api", "found": 3},
        "results": [
            {
                "location": "ES1422A",
                "city": "Madrid",
                "country": "ES",
                "distance": 1057.95,
                "measurements": [
                    {"parameter": "co", "value": 500, "lastUpdated": "2017-11-04T06:00:00.000Z",
                     "unit": "µg/m³", "sourceName": "EEA Spain"},
                    {"parameter": "pm10", "value": 12, "lastUpdated": "2017-11-04T06:00:00.000Z",
                     "unit": "µg/m³", "sourceName": "EEA Spain"},
                    {"parameter": "no2", "value": 40, "lastUpdated": "2017-11-01T06:00:00.000Z",
                     "unit": "µg/m³", "sourceName": "EEA Spain"},
                    {"parameter": "bc", "value": 3, "lastUpdated": "2017-11-04T06:00:00.000Z"},
                    {}
                ],
                "coordinates": {"latitude": 40.41, "longitude": -3.695}
            },
            {
                "location": "ES0118A",
                "city": "Madrid",
                "country": "ES",
                "measurements": [],
                "coordinates": {"latitude": 40.42, "longitude": -3.71}
            },
            {}
        ]
    }"#;

    fn cut_off() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2017-11-03T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn parse_feed() {
        let stations = parse_stations(FEED.as_bytes(), cut_off()).unwrap();
        assert_eq!(stations.len(), 2);

        let first = &stations[0];
        assert_eq!(first.location, "ES1422A");
        assert_eq!(first.city, "Madrid");
        assert_eq!(first.point, Point::new(-3.695, 40.41));
        // no2 is too old, bc is unknown and {} is incomplete
        let parameters: Vec<_> = first.measurements.iter().map(|m| m.parameter).collect();
        assert_eq!(parameters, [ParameterAir::Co, ParameterAir::Pm10]);
        assert_eq!(first.measurements[0].source_name, "EEA Spain");

        assert!(stations[1].measurements.is_empty());
    }

    #[test]
    fn missing_results_is_an_error() {
        let err = parse_stations(br#"{"meta": {}}"#, cut_off()).unwrap_err();
        assert!(matches!(err, SourceError::Json(_)));
    }

    #[test]
    fn invalid_header_is_rejected() {
        let err = OpenAqDataSource::new("http://localhost", Some(("bad header", "x"))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader(_)));
    }

    #[tokio::test]
    async fn update_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        std::fs::write(&path, FEED).unwrap();

        let url = format!("file://{}", path.display());
        let mut source = OpenAqDataSource::new(url, None).unwrap().with_cut_off(cut_off());
        assert!(source.update().await);
        assert_eq!(source.stations().len(), 2);
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_stations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        std::fs::write(&path, FEED).unwrap();

        let mut source = OpenAqDataSource::new(path.display().to_string(), None)
            .unwrap()
            .with_cut_off(cut_off());
        assert!(source.update().await);

        std::fs::write(&path, "not json").unwrap();
        assert!(!source.update().await);
        assert_eq!(source.stations().len(), 2);

        std::fs::remove_file(&path).unwrap();
        assert!(!source.update().await);
    }

    #[tokio::test]
    async fn default_cut_off_drops_stale_measurements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.json");
        std::fs::write(&path, FEED).unwrap();

        let mut source = OpenAqDataSource::new(path.display().to_string(), None).unwrap();
        assert!(source.update().await);
        assert!(source.stations().iter().all(|s| s.measurements.is_empty()));
    }
}
