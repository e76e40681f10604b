//! Environmental factors measured near streets, and per-request limits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of environmental exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentalFactorType {
    Pollution,
    Allergic,
    Noise,
}

impl FromStr for EnvironmentalFactorType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POLLUTION" => Ok(EnvironmentalFactorType::Pollution),
            "ALLERGIC" => Ok(EnvironmentalFactorType::Allergic),
            "NOISE" => Ok(EnvironmentalFactorType::Noise),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EnvironmentalFactorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvironmentalFactorType::Pollution => "POLLUTION",
            EnvironmentalFactorType::Allergic => "ALLERGIC",
            EnvironmentalFactorType::Noise => "NOISE",
        };
        f.write_str(name)
    }
}

/// One station's reading for a factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorMeasurement {
    pub factor_type: EnvironmentalFactorType,
    pub value: f64,
}

/// Combined exposure on a street edge from every nearby station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalFactor {
    pub factor_type: EnvironmentalFactorType,
    pub average: f64,
    pub peak: f64,
}

impl EnvironmentalFactor {
    /// Combine readings of one factor type. Returns `None` for no readings.
    pub fn combine(factor_type: EnvironmentalFactorType, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            factor_type,
            average: sum / values.len() as f64,
            peak,
        })
    }
}

/// Upper limits a request places on one factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalFactorThreshold {
    pub factor_type: EnvironmentalFactorType,
    pub max_average: Option<f64>,
    pub max_peak: Option<f64>,
}

impl EnvironmentalFactorThreshold {
    /// True when `factor` is of another type or stays within both limits.
    pub fn allows(&self, factor: &EnvironmentalFactor) -> bool {
        if factor.factor_type != self.factor_type {
            return true;
        }
        self.max_average.is_none_or(|max| factor.average <= max)
            && self.max_peak.is_none_or(|max| factor.peak <= max)
    }
}

/// Parse `ENVIRONMENTAL_{TYPE}_MAX_{AVERAGE|PEAK}=value` entries joined by `&`.
///
/// Entries for the same factor type merge into one threshold; later values
/// win. Malformed entries are skipped.
///
/// # Examples
///
/// ```
/// use transit_router::domain::{EnvironmentalFactorType, parse_thresholds};
///
/// let t = parse_thresholds(
///     "ENVIRONMENTAL_POLLUTION_MAX_AVERAGE=5.0&ENVIRONMENTAL_POLLUTION_MAX_PEAK=15.0",
/// );
/// assert_eq!(t.len(), 1);
/// assert_eq!(t[0].factor_type, EnvironmentalFactorType::Pollution);
/// assert_eq!(t[0].max_average, Some(5.0));
/// assert_eq!(t[0].max_peak, Some(15.0));
/// ```
pub fn parse_thresholds(input: &str) -> Vec<EnvironmentalFactorThreshold> {
    let mut thresholds: Vec<EnvironmentalFactorThreshold> = Vec::new();
    for entry in input.split('&') {
        let Some((factor_type, field, value)) = parse_threshold_entry(entry) else {
            continue;
        };
        let index = match thresholds.iter().position(|t| t.factor_type == factor_type) {
            Some(index) => index,
            None => {
                thresholds.push(EnvironmentalFactorThreshold {
                    factor_type,
                    max_average: None,
                    max_peak: None,
                });
                thresholds.len() - 1
            }
        };
        let threshold = &mut thresholds[index];
        match field {
            ThresholdField::Average => threshold.max_average = Some(value),
            ThresholdField::Peak => threshold.max_peak = Some(value),
        }
    }
    thresholds
}

enum ThresholdField {
    Average,
    Peak,
}

fn parse_threshold_entry(entry: &str) -> Option<(EnvironmentalFactorType, ThresholdField, f64)> {
    let tokens: Vec<&str> = entry.split('_').collect();
    let [prefix, factor, _, field_value] = tokens.as_slice() else {
        return None;
    };
    if *prefix != "ENVIRONMENTAL" {
        return None;
    }
    let factor_type = factor.parse().ok()?;
    let (field, value) = field_value.split_once('=')?;
    let field = match field {
        "AVERAGE" => ThresholdField::Average,
        "PEAK" => ThresholdField::Peak,
        _ => return None,
    };
    let value: f64 = value.parse().ok()?;
    Some((factor_type, field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_multiple_factors() {
        let t = parse_thresholds(
            "ENVIRONMENTAL_POLLUTION_MAX_AVERAGE=5.0&ENVIRONMENTAL_POLLUTION_MAX_PEAK=15.0&ENVIRONMENTAL_ALLERGIC_MAX_AVERAGE=10.0",
        );
        assert_eq!(
            t,
            vec![
                EnvironmentalFactorThreshold {
                    factor_type: EnvironmentalFactorType::Pollution,
                    max_average: Some(5.0),
                    max_peak: Some(15.0),
                },
                EnvironmentalFactorThreshold {
                    factor_type: EnvironmentalFactorType::Allergic,
                    max_average: Some(10.0),
                    max_peak: None,
                },
            ]
        );
    }

    #[test]
    fn later_value_wins() {
        let t = parse_thresholds(
            "ENVIRONMENTAL_NOISE_MAX_PEAK=70&ENVIRONMENTAL_NOISE_MAX_PEAK=65",
        );
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].max_peak, Some(65.0));
    }

    #[test]
    fn malformed_entries_are_ignored() {
        let t = parse_thresholds(
            "FOO&ENVIRONMENTAL_SMOG_MAX_PEAK=1&ENVIRONMENTAL_NOISE_MAX_PEAK&ENVIRONMENTAL_NOISE_MAX_MEDIAN=3&ENVIRONMENTAL_NOISE_MAX_PEAK=abc&OTHER_NOISE_MAX_PEAK=1&ENVIRONMENTAL_NOISE_MAX_PEAK_X=1",
        );
        assert!(t.is_empty());
        assert!(parse_thresholds("").is_empty());
    }

    #[test]
    fn threshold_allows() {
        let threshold = EnvironmentalFactorThreshold {
            factor_type: EnvironmentalFactorType::Pollution,
            max_average: Some(5.0),
            max_peak: Some(15.0),
        };
        let factor = |average, peak| EnvironmentalFactor {
            factor_type: EnvironmentalFactorType::Pollution,
            average,
            peak,
        };
        assert!(threshold.allows(&factor(5.0, 15.0)));
        assert!(!threshold.allows(&factor(5.1, 10.0)));
        assert!(!threshold.allows(&factor(1.0, 16.0)));

        let noise = EnvironmentalFactor {
            factor_type: EnvironmentalFactorType::Noise,
            average: 100.0,
            peak: 100.0,
        };
        assert!(threshold.allows(&noise));
    }

    #[test]
    fn combine_readings() {
        let f = EnvironmentalFactor::combine(EnvironmentalFactorType::Noise, &[40.0, 60.0, 80.0])
            .unwrap();
        assert_eq!(f.average, 60.0);
        assert_eq!(f.peak, 80.0);
        assert!(EnvironmentalFactor::combine(EnvironmentalFactorType::Noise, &[]).is_none());
    }
}
