//! Updater configuration.
//!
//! The updaters file is a JSON array of objects such as:
//!
//! ```json
//! [{
//!     "type": "environmental-updater",
//!     "frequencySec": 3600,
//!     "sourceType": "openaq",
//!     "url": "https://api.openaq.org/v1/latest?city=Madrid",
//!     "headerName": "X-API-Key",
//!     "headerValue": "secret"
//! }, {
//!     "type": "environmental-updater",
//!     "frequencySec": 3600,
//!     "sourceType": "medio-ambiente-madrid",
//!     "urlStationsPosition": "http://datos.madrid.es/egob/catalogo/211346-1-estaciones-acusticas.csv",
//!     "urlStationsData": "http://www.mambiente.munimadrid.es/opendata/ruido.txt"
//! }]
//! ```

use std::path::Path;

use serde::Deserialize;
use tokio::task::JoinHandle;

use super::environmental::{
    EnvironmentalDataSource, EnvironmentalUpdater, MadridNoiseDataSource, OpenAqDataSource,
};
use super::error::ConfigError;
use super::manager::WriterHandle;
use super::polling::PollingUpdater;

const ENVIRONMENTAL_UPDATER: &str = "environmental-updater";
const OPENAQ_SOURCE: &str = "openaq";
const MADRID_NOISE_SOURCE: &str = "medio-ambiente-madrid";

/// Configuration of one polling updater.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterConfig {
    #[serde(rename = "type")]
    pub updater_type: String,
    /// Seconds between polls. Zero or less polls once.
    #[serde(default)]
    pub frequency_sec: i64,
    pub source_type: Option<String>,
    pub url: Option<String>,
    pub header_name: Option<String>,
    pub header_value: Option<String>,
    /// Noise station positions.
    pub url_stations_position: Option<String>,
    /// Noise levels.
    pub url_stations_data: Option<String>,
}

/// An updater built from configuration, ready to spawn.
#[derive(Debug)]
pub enum ConfiguredUpdater {
    Air(PollingUpdater<EnvironmentalUpdater<OpenAqDataSource>>),
    Noise(PollingUpdater<EnvironmentalUpdater<MadridNoiseDataSource>>),
}

impl ConfiguredUpdater {
    pub fn name(&self) -> &str {
        match self {
            ConfiguredUpdater::Air(updater) => updater.name(),
            ConfiguredUpdater::Noise(updater) => updater.name(),
        }
    }

    pub fn frequency_sec(&self) -> i64 {
        match self {
            ConfiguredUpdater::Air(updater) => updater.frequency_sec(),
            ConfiguredUpdater::Noise(updater) => updater.frequency_sec(),
        }
    }

    pub fn spawn(self, writer: WriterHandle) -> JoinHandle<()> {
        match self {
            ConfiguredUpdater::Air(updater) => updater.spawn(writer),
            ConfiguredUpdater::Noise(updater) => updater.spawn(writer),
        }
    }
}

impl UpdaterConfig {
    /// Parse a JSON array of updater configurations.
    pub fn from_json(json: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Name the updater is logged under.
    pub fn name(&self) -> String {
        match self.url.as_ref().or(self.url_stations_data.as_ref()) {
            Some(url) => format!("{}:{url}", self.updater_type),
            None => self.updater_type.clone(),
        }
    }

    /// Build the updater this entry describes.
    pub fn build(&self) -> Result<ConfiguredUpdater, ConfigError> {
        if self.updater_type != ENVIRONMENTAL_UPDATER {
            return Err(ConfigError::UnknownType(self.updater_type.clone()));
        }
        let header = match (&self.header_name, &self.header_value) {
            (Some(name), Some(value)) => Some((name.as_str(), value.as_str())),
            (Some(_), None) => return Err(ConfigError::MissingField("headerValue")),
            (None, _) => None,
        };
        match self.source_type.as_deref().unwrap_or_default() {
            OPENAQ_SOURCE => {
                let url = self.url.as_deref().ok_or(ConfigError::MissingField("url"))?;
                let source = OpenAqDataSource::new(url, header)?;
                Ok(ConfiguredUpdater::Air(self.polling(source)))
            }
            MADRID_NOISE_SOURCE => {
                let positions = self
                    .url_stations_position
                    .as_deref()
                    .ok_or(ConfigError::MissingField("urlStationsPosition"))?;
                let data = self
                    .url_stations_data
                    .as_deref()
                    .ok_or(ConfigError::MissingField("urlStationsData"))?;
                let source = MadridNoiseDataSource::new(positions, data, header)?;
                Ok(ConfiguredUpdater::Noise(self.polling(source)))
            }
            other => Err(ConfigError::UnknownSourceType(other.to_string())),
        }
    }

    fn polling<S: EnvironmentalDataSource>(&self, source: S) -> PollingUpdater<EnvironmentalUpdater<S>> {
        PollingUpdater::new(EnvironmentalUpdater::new(self.name(), source), self.frequency_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openaq(url: &str) -> UpdaterConfig {
        UpdaterConfig {
            updater_type: ENVIRONMENTAL_UPDATER.to_string(),
            frequency_sec: 60,
            source_type: Some(OPENAQ_SOURCE.to_string()),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn parse_config_file() {
        let configs = UpdaterConfig::from_json(
            r#"[
                {"type": "environmental-updater", "frequencySec": 3600, "sourceType": "openaq",
                 "url": "https://api.openaq.org/v1/latest", "headerName": "X-API-Key",
                 "headerValue": "k"},
                {"type": "environmental-updater", "sourceType": "openaq", "url": "latest.json"},
                {"type": "environmental-updater", "sourceType": "medio-ambiente-madrid",
                 "urlStationsPosition": "estaciones.csv", "urlStationsData": "ruido.txt"}
            ]"#,
        )
        .unwrap();
        assert_eq!(configs.len(), 3);
        assert_eq!(configs[2].url_stations_position.as_deref(), Some("estaciones.csv"));
        assert_eq!(configs[2].url_stations_data.as_deref(), Some("ruido.txt"));
        assert_eq!(configs[0].frequency_sec, 3600);
        assert_eq!(configs[0].header_name.as_deref(), Some("X-API-Key"));
        assert_eq!(configs[1].frequency_sec, 0);
        assert_eq!(configs[1].header_value, None);
    }

    #[test]
    fn build_openaq_updater() {
        let updater = openaq("https://api.openaq.org/v1/latest").build().unwrap();
        assert!(matches!(updater, ConfiguredUpdater::Air(_)));
        assert_eq!(updater.frequency_sec(), 60);
        assert_eq!(updater.name(), "environmental-updater:https://api.openaq.org/v1/latest");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let config = UpdaterConfig {
            updater_type: "bike-rental".to_string(),
            ..openaq("x")
        };
        let err = config.build().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownType(t) if t == "bike-rental"));
    }

    #[test]
    fn build_noise_updater() {
        let config = UpdaterConfig {
            updater_type: ENVIRONMENTAL_UPDATER.to_string(),
            frequency_sec: 3600,
            source_type: Some(MADRID_NOISE_SOURCE.to_string()),
            url_stations_position: Some("estaciones.csv".to_string()),
            url_stations_data: Some("ruido.txt".to_string()),
            ..Default::default()
        };
        let updater = config.build().unwrap();
        assert!(matches!(updater, ConfiguredUpdater::Noise(_)));
        assert_eq!(updater.name(), "environmental-updater:ruido.txt");
        assert_eq!(updater.frequency_sec(), 3600);
    }

    #[test]
    fn noise_needs_both_files() {
        let config = UpdaterConfig {
            source_type: Some(MADRID_NOISE_SOURCE.to_string()),
            url_stations_data: Some("ruido.txt".to_string()),
            ..openaq("x")
        };
        let err = config.build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("urlStationsPosition")));

        let config = UpdaterConfig {
            url_stations_position: Some("estaciones.csv".to_string()),
            url_stations_data: None,
            ..config
        };
        let err = config.build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("urlStationsData")));
    }

    #[test]
    fn unknown_source_is_rejected() {
        let config = UpdaterConfig {
            source_type: Some("bike-rental-gbfs".to_string()),
            ..openaq("x")
        };
        assert!(matches!(config.build().unwrap_err(), ConfigError::UnknownSourceType(_)));

        let config = UpdaterConfig {
            source_type: None,
            ..openaq("x")
        };
        assert!(matches!(config.build().unwrap_err(), ConfigError::UnknownSourceType(_)));
    }

    #[test]
    fn url_is_mandatory() {
        let config = UpdaterConfig { url: None, ..openaq("x") };
        let err = config.build().unwrap_err();
        assert_eq!(err.to_string(), "missing mandatory 'url' configuration");
    }

    #[test]
    fn header_needs_a_value() {
        let config = UpdaterConfig {
            header_name: Some("X-API-Key".to_string()),
            ..openaq("x")
        };
        assert!(matches!(config.build().unwrap_err(), ConfigError::MissingField("headerValue")));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updaters.json");
        std::fs::write(&path, r#"[{"type": "environmental-updater"}]"#).unwrap();
        let configs = UpdaterConfig::load_all(&path).unwrap();
        assert_eq!(configs[0].source_type, None);

        let missing = UpdaterConfig::load_all(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
