use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::{Pollutant, Season};

/// One raw hourly measurement as delivered by the fetch layer. Value and
/// timestamp stay loosely typed so malformed rows can be dropped during
/// cleaning instead of aborting the read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub value: Option<f64>,
    pub parameter: String,
    pub city: String,
    pub station_name: String,
    pub sensor_id: u32,
    pub utc_datetime: Option<String>,
}

/// A measurement that survived cleaning: deduplicated, non-negative,
/// below the pollutant's plausibility cap, with both UTC and local wall
/// clock timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanReading {
    pub value: f64,
    pub parameter: Pollutant,
    pub city: String,
    pub station_name: String,
    pub sensor_id: u32,
    pub utc_datetime: DateTime<Utc>,
    pub local_datetime: NaiveDateTime,
}

/// A clean reading with its derived temporal attributes attached. All four
/// attributes are deterministic functions of the local timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub parameter: Pollutant,
    pub city: String,
    pub station_name: String,
    pub sensor_id: u32,
    pub utc_datetime: DateTime<Utc>,
    pub local_datetime: NaiveDateTime,
    pub day: NaiveDate,
    pub weekday: Weekday,
    pub season: Season,
    pub year: i32,
}

impl Reading {
    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.weekday)
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// One exported row of the enriched reading table: the reading plus every
/// group-level aggregate it inherits, serialized for the reporting layer.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedReading {
    pub value: f64,
    pub parameter: Pollutant,
    pub city: String,
    pub station_name: String,
    pub sensor_id: u32,
    pub utc_datetime: DateTime<Utc>,
    pub local_datetime: NaiveDateTime,
    pub day: NaiveDate,
    pub day_of_the_week: String,
    pub season: Season,
    pub year: i32,
    pub sensor_percent_coverage_per_day: f64,
    pub mean_sensor_percent_coverage_per_day: f64,
    pub sensor_percent_coverage_per_year: f64,
    pub valid_sensor: bool,
    pub active_sensors_per_day: u32,
    pub median_active_sensors_per_year: f64,
    pub percent_days_available_per_year: f64,
    pub quality_flag: String,
    pub day_mean_value_per_station: f64,
    pub day_mean_value: f64,
    pub day_max_value_per_station: f64,
    pub day_max_value: f64,
    pub day_median_value_per_station: f64,
    pub day_median_value: f64,
    pub mean_value_per_weekday: f64,
    pub mean_value_per_season: f64,
    pub mean_value_per_year: f64,
    pub median_hourly_value: f64,
    pub rolling_8h_mean: Option<f64>,
    pub mda8: Option<f64>,
}
