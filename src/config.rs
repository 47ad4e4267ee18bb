use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;
use serde::Deserialize;
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::Pollutant;

/// Immutable pipeline configuration, loaded once at startup and passed by
/// reference into every stage.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PipelineConfig {
    pub locations: Vec<String>,
    pub parameters: Vec<Pollutant>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Per-pollutant implausibility ceilings. A pollutant without an entry
    /// has no cap.
    #[serde(default)]
    pub implausible_value_caps: HashMap<Pollutant, f64>,
    #[validate(nested)]
    pub quality: QualityConfig,
    pub standards: StandardsConfig,
}

fn default_timezone() -> String {
    "Europe/Rome".to_string()
}

/// Coverage validity minimums and the six quality-flag thresholds.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QualityConfig {
    /// Minimum percent of the year's days a sensor must report to be valid.
    #[validate(range(min = 0.0, max = 100.0))]
    pub valid_sensor_annual_min: f64,
    /// Minimum mean daily coverage percent a sensor must hold to be valid.
    #[validate(range(min = 0.0, max = 100.0))]
    pub valid_sensor_daily_min: f64,
    /// Minimum daily coverage percent for an individual sensor-day to be kept.
    #[validate(range(min = 0.0, max = 100.0))]
    pub valid_day_min: f64,
    pub exclude_invalid_sensors: bool,
    pub exclude_invalid_days: bool,
    #[validate(nested)]
    pub flags: FlagThresholds,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FlagThresholds {
    pub high_sensors: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub high_days: f64,
    pub medium_sensors: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub medium_days: f64,
    pub low_sensors: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub low_days: f64,
}

/// Current and 2030 regulatory limits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StandardsConfig {
    /// Annual mean limits, current regime. O3 has no entry: it is not
    /// annually regulated in this model.
    #[serde(default)]
    pub current_annual: HashMap<Pollutant, f64>,
    /// Annual mean limits, 2030 regime.
    #[serde(default)]
    pub target_annual: HashMap<Pollutant, f64>,
    /// Daily limit values and allowed exceedance-day ceilings.
    #[serde(default)]
    pub daily: HashMap<Pollutant, DailyStandard>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DailyStandard {
    /// Daily value above which a day counts as an exceedance day.
    pub limit: f64,
    /// Allowed exceedance days under the current regime. `None` means the
    /// current regime defines no daily ceiling for this pollutant.
    #[serde(default)]
    pub current_days: Option<u32>,
    /// Allowed exceedance days under the 2030 regime.
    pub target_days: u32,
}

impl PipelineConfig {
    /// Load and validate a configuration file (YAML, TOML or JSON).
    /// Fails fast at startup on out-of-range thresholds or missing
    /// regulatory entries; the core never defaults a missing limit to zero.
    pub fn load(path: &Path) -> Result<PipelineConfig> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        let cfg: PipelineConfig = settings.try_deserialize()?;
        cfg.validate()?;
        cfg.check_standards()?;
        Ok(cfg)
    }

    /// Ensure every configured pollutant has the regulatory entries the
    /// compliance evaluator will need.
    pub fn check_standards(&self) -> Result<()> {
        for p in &self.parameters {
            if self.standards.daily.get(p).is_none() {
                return Err(missing("standards.daily", *p));
            }
            if p.uses_mda8() {
                // MDA8 compliance needs both exceedance-day ceilings.
                let daily = &self.standards.daily[p];
                if daily.current_days.is_none() {
                    return Err(missing("standards.daily.current_days", *p));
                }
            } else {
                if self.standards.current_annual.get(p).is_none() {
                    return Err(missing("standards.current_annual", *p));
                }
                if self.standards.target_annual.get(p).is_none() {
                    return Err(missing("standards.target_annual", *p));
                }
            }
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        Tz::from_str(&self.timezone)
            .map_err(|_| ProcessingError::UnknownTimeZone(self.timezone.clone()))
    }
}

fn missing(table: &str, parameter: Pollutant) -> ProcessingError {
    ProcessingError::MissingStandard {
        table: table.to_string(),
        parameter: parameter.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_yaml() -> &'static str {
        r#"
locations: [Roma, Milano]
parameters: [pm25, pm10, no2, o3]
timezone: Europe/Rome
implausible_value_caps:
  pm25: 800
  pm10: 1200
  no2: 1000
  o3: 800
quality:
  valid_sensor_annual_min: 60
  valid_sensor_daily_min: 30
  valid_day_min: 50
  exclude_invalid_sensors: true
  exclude_invalid_days: true
  flags:
    high_sensors: 3
    high_days: 90
    medium_sensors: 2
    medium_days: 75
    low_sensors: 1
    low_days: 50
standards:
  current_annual:
    pm25: 25
    pm10: 40
    no2: 40
  target_annual:
    pm25: 10
    pm10: 20
    no2: 20
  daily:
    pm10: { limit: 45, current_days: 35, target_days: 18 }
    pm25: { limit: 25, target_days: 18 }
    no2: { limit: 50, target_days: 18 }
    o3: { limit: 120, current_days: 25, target_days: 18 }
"#
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_sample_config() {
        let file = write_config(sample_yaml());
        let cfg = PipelineConfig::load(file.path()).unwrap();

        assert_eq!(cfg.locations.len(), 2);
        assert_eq!(cfg.parameters.len(), 4);
        assert_eq!(cfg.implausible_value_caps[&Pollutant::Pm25], 800.0);
        assert_eq!(cfg.standards.daily[&Pollutant::Pm10].current_days, Some(35));
        assert_eq!(cfg.standards.daily[&Pollutant::Pm25].current_days, None);
        assert_eq!(cfg.timezone().unwrap(), chrono_tz::Europe::Rome);
    }

    #[test]
    fn test_missing_annual_standard_fails_fast() {
        let yaml = sample_yaml().replace("    pm10: 40\n", "");
        let file = write_config(&yaml);
        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("current_annual"));
        assert!(err.to_string().contains("pm10"));
    }

    #[test]
    fn test_missing_ozone_current_days_fails_fast() {
        let yaml = sample_yaml().replace(
            "    o3: { limit: 120, current_days: 25, target_days: 18 }",
            "    o3: { limit: 120, target_days: 18 }",
        );
        let file = write_config(&yaml);
        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("current_days"));
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let yaml = sample_yaml().replace("valid_sensor_annual_min: 60", "valid_sensor_annual_min: 160");
        let file = write_config(&yaml);
        assert!(PipelineConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_bad_timezone_rejected() {
        let yaml = sample_yaml().replace("Europe/Rome", "Mars/Olympus");
        let file = write_config(&yaml);
        let cfg = PipelineConfig::load(file.path()).unwrap();
        assert!(cfg.timezone().is_err());
    }
}
