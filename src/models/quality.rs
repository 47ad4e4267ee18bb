use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Pollutant;

/// Ordinal confidence label for a (city, pollutant, year) group. Ordering
/// matters: `VeryLow < Low < Medium < High`, so the derived `Ord` gives the
/// tier ranking directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityFlag {
    VeryLow,
    Low,
    Medium,
    High,
}

impl QualityFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityFlag::VeryLow => "Very Low",
            QualityFlag::Low => "Low",
            QualityFlag::Medium => "Medium",
            QualityFlag::High => "High",
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coverage summary for one sensor in one year, computed before any
/// coverage-based exclusion.
#[derive(Debug, Clone, Serialize)]
pub struct SensorQuality {
    pub year: i32,
    pub city: String,
    pub parameter: Pollutant,
    pub station_name: String,
    pub sensor_id: u32,
    pub mean_sensor_percent_coverage_per_day: f64,
    pub sensor_percent_coverage_per_year: f64,
    pub valid_sensor: bool,
}

/// Coverage summary and confidence flag for one (city, pollutant, year)
/// group, computed on the filtered reading set.
#[derive(Debug, Clone, Serialize)]
pub struct CityQuality {
    pub city: String,
    pub year: i32,
    pub parameter: Pollutant,
    pub median_active_sensors: f64,
    pub percent_days_available: f64,
    pub flag: QualityFlag,
}
