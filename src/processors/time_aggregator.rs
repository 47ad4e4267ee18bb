use chrono::Datelike;
use tracing::info;

use crate::models::{CleanReading, Reading, Season};

/// Attaches day, weekday, season and year labels to every cleaned reading.
/// All four are pure functions of the local timestamp.
pub struct TimeAggregator;

impl TimeAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, readings: Vec<CleanReading>) -> Vec<Reading> {
        let out: Vec<Reading> = readings.into_iter().map(attach_temporal).collect();
        info!(rows = out.len(), "temporal attributes attached");
        out
    }
}

impl Default for TimeAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn attach_temporal(r: CleanReading) -> Reading {
    let day = r.local_datetime.date();
    Reading {
        day,
        weekday: day.weekday(),
        season: Season::from_date(day),
        year: day.year(),
        value: r.value,
        parameter: r.parameter,
        city: r.city,
        station_name: r.station_name,
        sensor_id: r.sensor_id,
        utc_datetime: r.utc_datetime,
        local_datetime: r.local_datetime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pollutant;
    use chrono::{TimeZone, Utc, Weekday};

    #[test]
    fn test_attach_temporal_uses_local_day() {
        // 23:30 UTC on Dec 31 is 00:30 local on Jan 1 in Rome.
        let utc = Utc.with_ymd_and_hms(2022, 12, 31, 23, 30, 0).unwrap();
        let local = utc
            .with_timezone(&chrono_tz::Europe::Rome)
            .naive_local();
        let clean = CleanReading {
            value: 10.0,
            parameter: Pollutant::Pm10,
            city: "Roma".to_string(),
            station_name: "Villa Ada".to_string(),
            sensor_id: 1,
            utc_datetime: utc,
            local_datetime: local,
        };

        let reading = attach_temporal(clean);
        assert_eq!(reading.day.to_string(), "2023-01-01");
        assert_eq!(reading.year, 2023);
        assert_eq!(reading.weekday, Weekday::Sun);
        assert_eq!(reading.season, Season::Winter);
    }
}
