use std::fmt;

use serde::{Serialize, Serializer};

use crate::models::Pollutant;

/// Three-tier categorical outcome of a threshold comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verdict {
    Good,
    Problematic,
    Critical,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Good => "Good",
            Verdict::Problematic => "Problematic",
            Verdict::Critical => "Critical",
        }
    }

    /// Descriptive form used in the compliance table. `two_tier` groups
    /// have no current-regime limit, only the 2030 one.
    pub fn describe(&self, two_tier: bool) -> String {
        if two_tier {
            match self {
                Verdict::Good => "Good (Below 2030 limit)".to_string(),
                Verdict::Problematic => "Problematic (Above 2030 limit)".to_string(),
                Verdict::Critical => "Critical (Above 2030 limit)".to_string(),
            }
        } else {
            match self {
                Verdict::Good => {
                    "Good (Below current limit and also below 2030 limit)".to_string()
                }
                Verdict::Problematic => {
                    "Problematic (Below current limit but above 2030 limit)".to_string()
                }
                Verdict::Critical => {
                    "Critical (Above current limits and above 2030 limits)".to_string()
                }
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

pub const NOT_REGULATED: &str = "Not regulated";
pub const NOT_APPLICABLE: &str = "Not Applicable";

fn ser_not_regulated<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(NOT_REGULATED),
    }
}

fn ser_not_applicable<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(NOT_APPLICABLE),
    }
}

/// One row of the compliance table for a (city, pollutant, year) group.
///
/// `None` means "not regulated" (for limits) or "not applicable" (for
/// computed values) and is a state of its own, never collapsed to zero.
/// The verdict enums are kept alongside their descriptive strings so that
/// callers can branch without parsing text.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceRecord {
    pub city: String,
    pub parameter: Pollutant,
    pub year: i32,
    pub yearly_mean: f64,
    #[serde(serialize_with = "ser_not_regulated")]
    pub current_annual_limit: Option<f64>,
    #[serde(serialize_with = "ser_not_regulated")]
    pub target_annual_limit: Option<f64>,
    #[serde(skip)]
    pub annual_verdict: Option<Verdict>,
    pub annual_compliance: String,
    pub percent_above_current: String,
    pub percent_above_target: String,
    #[serde(serialize_with = "ser_not_regulated")]
    pub daily_limit_value: Option<f64>,
    #[serde(serialize_with = "ser_not_applicable")]
    pub days_above_limit: Option<f64>,
    #[serde(serialize_with = "ser_not_regulated")]
    pub current_days_limit: Option<u32>,
    #[serde(serialize_with = "ser_not_regulated")]
    pub target_days_limit: Option<u32>,
    #[serde(skip)]
    pub days_verdict: Option<Verdict>,
    pub days_compliance: String,
    pub quality_flag: String,
    #[serde(serialize_with = "ser_not_applicable")]
    pub median_active_sensors: Option<f64>,
    #[serde(serialize_with = "ser_not_applicable")]
    pub percent_days_available: Option<f64>,
}

/// Exceedance-day count for one station in one year, used by the quality
/// deep-dive. O3 is excluded because MDA8 is not defined per station.
#[derive(Debug, Clone, Serialize)]
pub struct StationExceedance {
    pub city: String,
    pub parameter: Pollutant,
    pub year: i32,
    pub station_name: String,
    pub exceedance_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_descriptions() {
        assert_eq!(
            Verdict::Critical.describe(false),
            "Critical (Above current limits and above 2030 limits)"
        );
        assert_eq!(Verdict::Good.describe(true), "Good (Below 2030 limit)");
    }

    #[test]
    fn test_none_serializes_as_marker_strings() {
        let record = ComplianceRecord {
            city: "Roma".to_string(),
            parameter: Pollutant::O3,
            year: 2023,
            yearly_mean: 41.2,
            current_annual_limit: None,
            target_annual_limit: None,
            annual_verdict: None,
            annual_compliance: NOT_APPLICABLE.to_string(),
            percent_above_current: NOT_APPLICABLE.to_string(),
            percent_above_target: NOT_APPLICABLE.to_string(),
            daily_limit_value: Some(120.0),
            days_above_limit: None,
            current_days_limit: Some(25),
            target_days_limit: Some(18),
            days_verdict: None,
            days_compliance: NOT_APPLICABLE.to_string(),
            quality_flag: "High".to_string(),
            median_active_sensors: Some(3.0),
            percent_days_available: Some(98.1),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["current_annual_limit"], NOT_REGULATED);
        assert_eq!(json["days_above_limit"], NOT_APPLICABLE);
        assert_eq!(json["daily_limit_value"], 120.0);
    }
}
