//! Climate summaries for trails
//!
//! This module handles:
//! - The `ClimateSummary` value returned to callers
//! - A deterministic synthetic model used whenever live data is missing
//! - Fetching and aggregating historical observations
//! - The resolver that ties geometry, region lookup and fetching together

pub mod clock;
pub mod observations;
pub mod resolver;
pub mod synthetic;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use clock::{Clock, FixedClock, SystemClock};
pub use observations::{Observation, ObservationAggregate, ObservationFetcher, ObservationWindow};
pub use resolver::ClimateResolver;
pub use synthetic::synthesize;

/// Where a summary's numbers came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateStatus {
    /// At least one field came from observations
    Live,
    /// The observations call exceeded its deadline
    SyntheticTimeout,
    /// The observations service was unreachable or returned nothing
    SyntheticNoData,
    /// The observations response could not be used
    SyntheticError,
}

impl ClimateStatus {
    pub fn is_synthetic(&self) -> bool {
        !matches!(self, Self::Live)
    }
}

impl std::fmt::Display for ClimateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::SyntheticTimeout => write!(f, "synthetic_timeout"),
            Self::SyntheticNoData => write!(f, "synthetic_no_data"),
            Self::SyntheticError => write!(f, "synthetic_error"),
        }
    }
}

/// Temperature range in degrees Fahrenheit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl Temperature {
    /// Strip signs, then order the three values so `min <= average <= max`
    ///
    /// Sign stripping loses the difference between readings equally far
    /// below and above zero. Kept as-is because it changes output.
    pub fn normalized(self) -> Self {
        let values = [self.average.abs(), self.min.abs(), self.max.abs()];
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            average: round2(values[0].clamp(min, max)),
            min: round2(min),
            max: round2(max),
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.average && self.average <= self.max
    }
}

/// Best-effort climate summary for one trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateSummary {
    /// Millimetres per day
    pub precipitation: f64,
    pub temperature: Temperature,
    /// Relative humidity in percent; only the synthetic model supplies it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Miles per hour
    pub wind_speed: f64,
    /// Month the numbers describe, e.g. "October"
    pub source_month: String,
    pub status: ClimateStatus,
    #[serde(default)]
    pub trail_name: String,
}

impl ClimateSummary {
    pub fn with_status(mut self, status: ClimateStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_trail_name(mut self, name: impl Into<String>) -> Self {
        self.trail_name = name.into();
        self
    }
}

/// Full month name for a date
pub fn month_name(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_strips_sign_and_orders() {
        let t = Temperature {
            average: 5.0,
            min: -10.0,
            max: 20.0,
        }
        .normalized();

        assert_eq!(t.min, 5.0);
        assert_eq!(t.average, 5.0);
        assert_eq!(t.max, 20.0);
        assert!(t.is_ordered());
    }

    #[test]
    fn test_normalized_keeps_ordered_positive_values() {
        let t = Temperature {
            average: 61.456,
            min: 48.0,
            max: 73.5,
        }
        .normalized();

        assert_eq!(t.average, 61.46);
        assert_eq!(t.min, 48.0);
        assert_eq!(t.max, 73.5);
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = ClimateSummary {
            precipitation: 2.54,
            temperature: Temperature {
                average: 60.0,
                min: 50.0,
                max: 70.0,
            },
            humidity: None,
            wind_speed: 6.5,
            source_month: "October".to_string(),
            status: ClimateStatus::SyntheticNoData,
            trail_name: "Raven Rock".to_string(),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["windSpeed"], 6.5);
        assert_eq!(json["sourceMonth"], "October");
        assert_eq!(json["status"], "synthetic_no_data");
        assert_eq!(json["trailName"], "Raven Rock");
        assert!(json.get("humidity").is_none());
    }

    #[test]
    fn test_month_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(month_name(date), "October");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ClimateStatus::SyntheticTimeout.to_string(), "synthetic_timeout");
        assert!(ClimateStatus::SyntheticError.is_synthetic());
        assert!(!ClimateStatus::Live.is_synthetic());
    }
}
