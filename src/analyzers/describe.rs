use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Pollutant, RawReading, Reading};
use crate::utils::stats::round2;

/// Distribution summary for one (city, parameter, station) group, in the
/// shape of a `describe()` table row.
#[derive(Debug, Clone, Serialize)]
pub struct ValueSummary {
    pub city: String,
    pub parameter: Pollutant,
    pub station_name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ValueSummary {
    fn from_values(city: String, parameter: Pollutant, station_name: String, values: &mut Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = if count > 1 {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        } else {
            0.0
        };
        Self {
            city,
            parameter,
            station_name,
            count,
            mean: round2(mean),
            std: round2(variance.sqrt()),
            min: values[0],
            q25: round2(quantile(values, 0.25)),
            median: round2(quantile(values, 0.5)),
            q75: round2(quantile(values, 0.75)),
            max: values[count - 1],
        }
    }
}

/// Linear-interpolation quantile over an already sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Per-station value summaries, sorted by group key for stable output.
pub fn describe_readings(readings: &[Reading]) -> Vec<ValueSummary> {
    summarize(readings.iter().map(|r| {
        (
            (r.city.clone(), r.parameter, r.station_name.clone()),
            r.value,
        )
    }))
}

/// Same summaries over the raw rows, before any cleaning. Rows without a
/// recognizable pollutant or a finite numeric value carry nothing to
/// summarize and are skipped, not dropped from the data.
pub fn describe_raw(raw: &[RawReading]) -> Vec<ValueSummary> {
    summarize(raw.iter().filter_map(|r| {
        let parameter: Pollutant = r.parameter.parse().ok()?;
        let value = r.value.filter(|v| v.is_finite())?;
        Some(((r.city.clone(), parameter, r.station_name.clone()), value))
    }))
}

fn summarize(
    rows: impl Iterator<Item = ((String, Pollutant, String), f64)>,
) -> Vec<ValueSummary> {
    let mut groups: HashMap<(String, Pollutant, String), Vec<f64>> = HashMap::new();
    for (key, value) in rows {
        groups.entry(key).or_default().push(value);
    }

    let mut summaries: Vec<ValueSummary> = groups
        .into_iter()
        .map(|((city, parameter, station_name), mut values)| {
            ValueSummary::from_values(city, parameter, station_name, &mut values)
        })
        .collect();
    summaries.sort_by(|a, b| {
        (&a.city, a.parameter, &a.station_name).cmp(&(&b.city, b.parameter, &b.station_name))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, TimeZone, Utc};

    use crate::models::Season;

    fn reading(station: &str, value: f64) -> Reading {
        let utc = Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        Reading {
            value,
            parameter: Pollutant::Pm10,
            city: "Roma".to_string(),
            station_name: station.to_string(),
            sensor_id: 1,
            utc_datetime: utc,
            local_datetime: utc.naive_utc(),
            day,
            weekday: day.weekday(),
            season: Season::Spring,
            year: 2023,
        }
    }

    #[test]
    fn test_describe_single_group() {
        let readings: Vec<Reading> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .map(|v| reading("A", *v))
            .collect();
        let summaries = describe_readings(&readings);
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.q25, 2.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.q75, 4.0);
        assert_eq!(s.max, 5.0);
        // Sample standard deviation of 1..5.
        assert_eq!(s.std, 1.58);
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [10.0, 20.0];
        assert_eq!(quantile(&sorted, 0.25), 12.5);
        assert_eq!(quantile(&sorted, 0.75), 17.5);
    }

    #[test]
    fn test_describe_raw_skips_unusable_rows() {
        let row = |value: Option<f64>, parameter: &str| RawReading {
            value,
            parameter: parameter.to_string(),
            city: "Roma".to_string(),
            station_name: "A".to_string(),
            sensor_id: 1,
            utc_datetime: Some("2023-06-01T10:00:00Z".to_string()),
        };
        let raw = vec![
            row(Some(10.0), "pm10"),
            row(Some(30.0), "pm10"),
            row(Some(f64::NAN), "pm10"),
            row(None, "pm10"),
            row(Some(5.0), "so2"),
        ];

        let summaries = describe_raw(&raw);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].mean, 20.0);
    }

    #[test]
    fn test_groups_sorted_by_station() {
        let readings = vec![reading("B", 1.0), reading("A", 2.0)];
        let summaries = describe_readings(&readings);
        assert_eq!(summaries[0].station_name, "A");
        assert_eq!(summaries[1].station_name, "B");
    }
}
