//! Monitoring stations and the environmental factors they report.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use geo::Point;

use crate::domain::{EnvironmentalFactorType, FactorMeasurement};

/// A located station whose readings become per-edge environmental factors.
pub trait EnvironmentalStation: fmt::Debug + Clone + Send + Sync + 'static {
    /// Name used in logs.
    fn label(&self) -> &str;

    /// Longitude / latitude.
    fn point(&self) -> Point<f64>;

    fn has_measurements(&self) -> bool;

    /// One value per factor the readings cover.
    fn factor_measurements(&self) -> Vec<FactorMeasurement>;
}

/// Air pollutant reported by a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterAir {
    Co,
    So2,
    No2,
    O3,
    Pm10,
    Pm25,
}

impl ParameterAir {
    /// Weight of this pollutant in the pollution index.
    pub fn pollution_weight(self) -> f64 {
        match self {
            // Eight hour limit
            ParameterAir::Co => 6.67466986795,
            ParameterAir::No2 => 0.5,
            ParameterAir::So2 => 0.8,
            ParameterAir::O3 => 0.556,
            ParameterAir::Pm10 | ParameterAir::Pm25 => 0.67,
        }
    }

    /// Weight in the allergic index. Only coarse particles count.
    pub fn allergic_weight(self) -> Option<f64> {
        match self {
            ParameterAir::Pm10 => Some(1.0),
            _ => None,
        }
    }
}

impl FromStr for ParameterAir {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "co" => Ok(ParameterAir::Co),
            "so2" => Ok(ParameterAir::So2),
            "no2" => Ok(ParameterAir::No2),
            "o3" => Ok(ParameterAir::O3),
            "pm10" => Ok(ParameterAir::Pm10),
            "pm25" => Ok(ParameterAir::Pm25),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ParameterAir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterAir::Co => "co",
            ParameterAir::So2 => "so2",
            ParameterAir::No2 => "no2",
            ParameterAir::O3 => "o3",
            ParameterAir::Pm10 => "pm10",
            ParameterAir::Pm25 => "pm25",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationMeasurement {
    pub parameter: ParameterAir,
    pub value: f64,
    pub last_updated: DateTime<Utc>,
    pub unit: String,
    pub source_name: String,
}

/// An air-quality monitoring station.
#[derive(Debug, Clone, PartialEq)]
pub struct AirStation {
    pub location: String,
    pub city: String,
    pub country: String,
    pub measurements: Vec<StationMeasurement>,
    /// Longitude / latitude.
    pub point: Point<f64>,
}

impl EnvironmentalStation for AirStation {
    fn label(&self) -> &str {
        &self.location
    }

    fn point(&self) -> Point<f64> {
        self.point
    }

    fn has_measurements(&self) -> bool {
        !self.measurements.is_empty()
    }

    /// Pollution is the worst weighted pollutant; allergic exposure is the
    /// mean of the weighted allergen readings. Factors with no readings are
    /// left out.
    fn factor_measurements(&self) -> Vec<FactorMeasurement> {
        let mut factors = Vec::new();

        let pollution = self
            .measurements
            .iter()
            .map(|m| m.value * m.parameter.pollution_weight())
            .reduce(f64::max);
        if let Some(value) = pollution {
            factors.push(FactorMeasurement {
                factor_type: EnvironmentalFactorType::Pollution,
                value,
            });
        }

        let allergens: Vec<f64> = self
            .measurements
            .iter()
            .filter_map(|m| m.parameter.allergic_weight().map(|w| m.value * w))
            .collect();
        if !allergens.is_empty() {
            factors.push(FactorMeasurement {
                factor_type: EnvironmentalFactorType::Allergic,
                value: allergens.iter().sum::<f64>() / allergens.len() as f64,
            });
        }

        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurement(parameter: ParameterAir, value: f64) -> StationMeasurement {
        StationMeasurement {
            parameter,
            value,
            last_updated: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            unit: "µg/m³".to_string(),
            source_name: "test".to_string(),
        }
    }

    fn station(measurements: Vec<StationMeasurement>) -> AirStation {
        AirStation {
            location: "ES1422A".to_string(),
            city: "Madrid".to_string(),
            country: "ES".to_string(),
            measurements,
            point: Point::new(-3.7033, 40.4191),
        }
    }

    fn factor(factors: &[FactorMeasurement], kind: EnvironmentalFactorType) -> Option<f64> {
        factors.iter().find(|f| f.factor_type == kind).map(|f| f.value)
    }

    #[test]
    fn carbon_monoxide_dominates_pollution() {
        let s = station(vec![measurement(ParameterAir::Co, 500.0)]);
        let factors = s.factor_measurements();
        let pollution = factor(&factors, EnvironmentalFactorType::Pollution).unwrap();
        assert!((pollution - 3337.334933975).abs() < 1e-6);
        assert_eq!(factor(&factors, EnvironmentalFactorType::Allergic), None);
    }

    #[test]
    fn pollution_is_weighted_max() {
        let s = station(vec![
            measurement(ParameterAir::No2, 100.0),
            measurement(ParameterAir::O3, 100.0),
            measurement(ParameterAir::So2, 10.0),
        ]);
        let pollution = factor(&s.factor_measurements(), EnvironmentalFactorType::Pollution).unwrap();
        assert!((pollution - 55.6).abs() < 1e-9);
    }

    #[test]
    fn allergic_uses_coarse_particles() {
        let s = station(vec![
            measurement(ParameterAir::Pm10, 20.0),
            measurement(ParameterAir::Pm10, 40.0),
            measurement(ParameterAir::Pm25, 90.0),
        ]);
        let factors = s.factor_measurements();
        assert_eq!(factor(&factors, EnvironmentalFactorType::Allergic), Some(30.0));
        let pollution = factor(&factors, EnvironmentalFactorType::Pollution).unwrap();
        assert!((pollution - 60.3).abs() < 1e-9);
    }

    #[test]
    fn no_measurements_no_factors() {
        assert!(station(Vec::new()).factor_measurements().is_empty());
    }

    #[test]
    fn parse_parameters() {
        assert_eq!("pm25".parse::<ParameterAir>(), Ok(ParameterAir::Pm25));
        assert_eq!(ParameterAir::So2.to_string(), "so2");
        assert_eq!("bc".parse::<ParameterAir>(), Err("bc".to_string()));
    }
}
