use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{CleanReading, Pollutant, RawReading};

/// Counts of rows excluded by each cleaning rule. Exclusion is policy, not
/// failure; the counts appear in the run summary.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CleaningReport {
    pub total_rows: usize,
    pub duplicate_rows: usize,
    pub missing_value: usize,
    pub missing_timestamp: usize,
    pub unparseable_timestamp: usize,
    pub unknown_parameter: usize,
    pub negative_value: usize,
    pub implausible_value: usize,
    pub kept_rows: usize,
}

impl CleaningReport {
    pub fn excluded_rows(&self) -> usize {
        self.total_rows - self.kept_rows
    }

    pub fn summary(&self) -> String {
        format!(
            "=== Cleaning Report ===\n\
            Total rows: {}\n\
            Kept rows: {} ({:.1}%)\n\
            Duplicates: {}\n\
            Missing value: {}\n\
            Missing timestamp: {}\n\
            Unparseable timestamp: {}\n\
            Unknown parameter: {}\n\
            Negative value: {}\n\
            Implausible value: {}",
            self.total_rows,
            self.kept_rows,
            if self.total_rows > 0 {
                100.0 * self.kept_rows as f64 / self.total_rows as f64
            } else {
                0.0
            },
            self.duplicate_rows,
            self.missing_value,
            self.missing_timestamp,
            self.unparseable_timestamp,
            self.unknown_parameter,
            self.negative_value,
            self.implausible_value,
        )
    }
}

/// Cleaning stage: deduplicate, drop unusable rows, attach the local wall
/// clock time for the configured civil zone.
pub struct Cleaner<'a> {
    config: &'a PipelineConfig,
    tz: Tz,
}

impl<'a> Cleaner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        let tz = config.timezone()?;
        Ok(Self { config, tz })
    }

    /// Apply the cleaning rules in order: exact duplicates, missing value or
    /// timestamp, negative values, per-pollutant implausibility caps. Rows
    /// are silently excluded and counted; nothing here is an error.
    pub fn clean(&self, raw: Vec<RawReading>) -> (Vec<CleanReading>, CleaningReport) {
        let mut report = CleaningReport {
            total_rows: raw.len(),
            ..Default::default()
        };

        let mut seen: HashSet<(Option<u64>, String, String, String, u32, Option<String>)> =
            HashSet::new();
        let mut cleaned = Vec::with_capacity(raw.len());

        for row in raw {
            let key = (
                row.value.map(f64::to_bits),
                row.parameter.clone(),
                row.city.clone(),
                row.station_name.clone(),
                row.sensor_id,
                row.utc_datetime.clone(),
            );
            if !seen.insert(key) {
                report.duplicate_rows += 1;
                continue;
            }

            let Some(value) = row.value else {
                report.missing_value += 1;
                continue;
            };
            // NaN compares false against every threshold below, so it has
            // to be caught here as a missing value.
            if !value.is_finite() {
                report.missing_value += 1;
                continue;
            }
            let Some(timestamp) = row.utc_datetime.as_deref() else {
                report.missing_timestamp += 1;
                continue;
            };
            let Some(utc_datetime) = parse_utc(timestamp) else {
                report.unparseable_timestamp += 1;
                continue;
            };
            let Ok(parameter) = row.parameter.parse::<Pollutant>() else {
                report.unknown_parameter += 1;
                continue;
            };
            if !self.config.parameters.contains(&parameter) {
                report.unknown_parameter += 1;
                continue;
            }
            if value < 0.0 {
                report.negative_value += 1;
                continue;
            }
            if let Some(cap) = self.config.implausible_value_caps.get(&parameter) {
                if value > *cap {
                    report.implausible_value += 1;
                    continue;
                }
            }

            let local_datetime = utc_datetime.with_timezone(&self.tz).naive_local();
            cleaned.push(CleanReading {
                value,
                parameter,
                city: row.city,
                station_name: row.station_name,
                sensor_id: row.sensor_id,
                utc_datetime,
                local_datetime,
            });
        }

        report.kept_rows = cleaned.len();
        info!(
            kept = report.kept_rows,
            excluded = report.excluded_rows(),
            "cleaning complete"
        );
        debug!("{}", report.summary());

        (cleaned, report)
    }
}

/// Parse a UTC timestamp, accepting RFC 3339 and the common space-separated
/// form with or without an explicit offset.
fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    None
}
