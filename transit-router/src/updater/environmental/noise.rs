//! Acoustic monitoring stations.

use std::fmt;

use chrono::NaiveDateTime;
use geo::Point;

use super::station::EnvironmentalStation;
use crate::domain::{EnvironmentalFactorType, FactorMeasurement};

/// Sound level statistic over a measurement period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterNoise {
    /// Equivalent continuous level
    LAeq,
    /// Level exceeded 1% of the time
    L01,
    L10,
    L50,
    L90,
    L99,
}

impl ParameterNoise {
    /// Column order of the Madrid acoustic network feed.
    pub const ALL: [ParameterNoise; 6] = [
        ParameterNoise::LAeq,
        ParameterNoise::L01,
        ParameterNoise::L10,
        ParameterNoise::L50,
        ParameterNoise::L90,
        ParameterNoise::L99,
    ];
}

impl fmt::Display for ParameterNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterNoise::LAeq => "LAeq",
            ParameterNoise::L01 => "L01",
            ParameterNoise::L10 => "L10",
            ParameterNoise::L50 => "L50",
            ParameterNoise::L90 => "L90",
            ParameterNoise::L99 => "L99",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseMeasurement {
    pub parameter: ParameterNoise,
    /// dB
    pub value: f64,
    /// Station local time.
    pub last_updated: NaiveDateTime,
    pub unit: String,
    pub source_name: String,
}

/// A noise monitoring station.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseStation {
    pub id: String,
    pub location: String,
    pub city: String,
    pub country: String,
    pub measurements: Vec<NoiseMeasurement>,
    /// Longitude / latitude.
    pub point: Point<f64>,
}

impl EnvironmentalStation for NoiseStation {
    fn label(&self) -> &str {
        &self.id
    }

    fn point(&self) -> Point<f64> {
        self.point
    }

    fn has_measurements(&self) -> bool {
        !self.measurements.is_empty()
    }

    /// Noise is the mean of every level reported.
    fn factor_measurements(&self) -> Vec<FactorMeasurement> {
        if self.measurements.is_empty() {
            return Vec::new();
        }
        let total: f64 = self.measurements.iter().map(|m| m.value).sum();
        vec![FactorMeasurement {
            factor_type: EnvironmentalFactorType::Noise,
            value: total / self.measurements.len() as f64,
        }]
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn station(values: &[f64]) -> NoiseStation {
        let last_updated = NaiveDate::from_ymd_opt(2017, 11, 9)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();
        NoiseStation {
            id: "1".to_string(),
            location: "Pº Recoletos".to_string(),
            city: "Madrid".to_string(),
            country: "Spain".to_string(),
            measurements: ParameterNoise::ALL
                .iter()
                .zip(values)
                .map(|(&parameter, &value)| NoiseMeasurement {
                    parameter,
                    value,
                    last_updated,
                    unit: "db".to_string(),
                    source_name: "test".to_string(),
                })
                .collect(),
            point: Point::new(-3.6908, 40.4233),
        }
    }

    #[test]
    fn noise_is_the_mean_level() {
        let s = station(&[67.3, 73.8, 71.3, 63.4, 57.1, 53.0]);
        let factors = s.factor_measurements();
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].factor_type, EnvironmentalFactorType::Noise);
        let expected = (67.3 + 73.8 + 71.3 + 63.4 + 57.1 + 53.0) / 6.0;
        assert!((factors[0].value - expected).abs() < 1e-9);
    }

    #[test]
    fn silent_station_has_no_factor() {
        let s = station(&[]);
        assert!(!s.has_measurements());
        assert!(s.factor_measurements().is_empty());
    }

    #[test]
    fn parameter_names() {
        assert_eq!(ParameterNoise::LAeq.to_string(), "LAeq");
        assert_eq!(ParameterNoise::ALL[5].to_string(), "L99");
    }
}
