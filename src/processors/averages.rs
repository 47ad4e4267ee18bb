use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use rayon::prelude::*;
use tracing::info;

use crate::models::{Pollutant, Reading, Season};
use crate::processors::mda8::Mda8Engine;
use crate::utils::stats::{max, mean, median};

pub type GroupKey = (String, Pollutant);
pub type StationDayKey = (String, Pollutant, String, NaiveDate);
pub type CityDayKey = (String, Pollutant, NaiveDate);
pub type CityHourKey = (String, Pollutant, DateTime<Utc>);
pub type CityYearKey = (String, Pollutant, i32);

#[derive(Debug, Clone, Copy)]
pub struct DailyStats {
    pub mean: f64,
    pub max: f64,
    pub median: f64,
}

/// Group-level aggregate tables. Each is computed once and joined back to
/// row level by its group key; nothing is recomputed per row.
#[derive(Debug, Default)]
pub struct Aggregates {
    pub station_daily: HashMap<StationDayKey, DailyStats>,
    /// City-day statistics built from station-day statistics: the mean is a
    /// mean of per-station daily means, never a flat mean over raw hourly
    /// readings. Stations weigh equally no matter how often they report.
    pub city_daily: HashMap<CityDayKey, DailyStats>,
    pub weekday_means: HashMap<(String, Pollutant, Weekday), f64>,
    pub season_means: HashMap<(String, Pollutant, Season), f64>,
    pub annual_means: HashMap<CityYearKey, f64>,
    /// Cross-sensor median at each UTC hour, the input series for MDA8.
    pub median_hourly: HashMap<CityHourKey, f64>,
    pub rolling_8h: HashMap<CityHourKey, Option<f64>>,
    pub mda8: HashMap<CityDayKey, Option<f64>>,
}

/// Derives mean/median/max statistics at station-day, city-day, weekday,
/// season and year granularity from the filtered reading set, and runs the
/// MDA8 engine for the pollutants regulated through it.
pub struct AggregateCalculator {
    tz: Tz,
}

impl AggregateCalculator {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn calculate(&self, readings: &[Reading]) -> Aggregates {
        let mut aggregates = Aggregates::default();

        // Station-day statistics.
        let mut station_day_values: HashMap<StationDayKey, Vec<f64>> = HashMap::new();
        for r in readings {
            station_day_values
                .entry((r.city.clone(), r.parameter, r.station_name.clone(), r.day))
                .or_default()
                .push(r.value);
        }
        for (key, values) in &station_day_values {
            aggregates.station_daily.insert(
                key.clone(),
                DailyStats {
                    mean: mean(values).unwrap_or(f64::NAN),
                    max: max(values).unwrap_or(f64::NAN),
                    median: median(values).unwrap_or(f64::NAN),
                },
            );
        }

        // City-day statistics from the station-day layer (two-stage).
        let mut city_day_stats: HashMap<CityDayKey, Vec<DailyStats>> = HashMap::new();
        for ((city, parameter, _, day), stats) in &aggregates.station_daily {
            city_day_stats
                .entry((city.clone(), *parameter, *day))
                .or_default()
                .push(*stats);
        }
        for (key, stats) in &city_day_stats {
            let means: Vec<f64> = stats.iter().map(|s| s.mean).collect();
            let maxes: Vec<f64> = stats.iter().map(|s| s.max).collect();
            let medians: Vec<f64> = stats.iter().map(|s| s.median).collect();
            aggregates.city_daily.insert(
                key.clone(),
                DailyStats {
                    mean: mean(&means).unwrap_or(f64::NAN),
                    max: max(&maxes).unwrap_or(f64::NAN),
                    median: median(&medians).unwrap_or(f64::NAN),
                },
            );
        }

        // Weekday, season and annual means over distinct city-days.
        let mut weekday_values: HashMap<(String, Pollutant, Weekday), Vec<f64>> = HashMap::new();
        let mut season_values: HashMap<(String, Pollutant, Season), Vec<f64>> = HashMap::new();
        let mut annual_values: HashMap<CityYearKey, Vec<f64>> = HashMap::new();
        for ((city, parameter, day), stats) in &aggregates.city_daily {
            weekday_values
                .entry((city.clone(), *parameter, day.weekday()))
                .or_default()
                .push(stats.mean);
            season_values
                .entry((city.clone(), *parameter, Season::from_date(*day)))
                .or_default()
                .push(stats.mean);
            annual_values
                .entry((city.clone(), *parameter, day.year()))
                .or_default()
                .push(stats.mean);
        }
        aggregates.weekday_means = grouped_means(weekday_values);
        aggregates.season_means = grouped_means(season_values);
        aggregates.annual_means = grouped_means(annual_values);

        // Cross-sensor hourly medians.
        let mut hourly_values: HashMap<CityHourKey, Vec<f64>> = HashMap::new();
        for r in readings {
            hourly_values
                .entry((r.city.clone(), r.parameter, r.utc_datetime))
                .or_default()
                .push(r.value);
        }
        for (key, values) in &hourly_values {
            if let Some(m) = median(values) {
                aggregates.median_hourly.insert(key.clone(), m);
            }
        }

        // MDA8 per (city, pollutant) partition. Partitions are independent;
        // results do not depend on processing order.
        let mut partitions: HashMap<GroupKey, Vec<(DateTime<Utc>, f64)>> = HashMap::new();
        for ((city, parameter, ts), value) in &aggregates.median_hourly {
            if parameter.uses_mda8() {
                partitions
                    .entry((city.clone(), *parameter))
                    .or_default()
                    .push((*ts, *value));
            }
        }
        let engine = Mda8Engine::new(self.tz);
        let outputs: Vec<(GroupKey, crate::processors::mda8::Mda8Output)> = partitions
            .into_par_iter()
            .map(|(key, mut series)| {
                series.sort_by_key(|(ts, _)| *ts);
                let output = engine.compute(&series);
                (key, output)
            })
            .collect();
        for ((city, parameter), output) in outputs {
            for (ts, value) in output.rolling {
                aggregates
                    .rolling_8h
                    .insert((city.clone(), parameter, ts), value);
            }
            for (day, value) in output.mda8 {
                aggregates.mda8.insert((city.clone(), parameter, day), value);
            }
        }

        info!(
            station_days = aggregates.station_daily.len(),
            city_days = aggregates.city_daily.len(),
            mda8_days = aggregates.mda8.len(),
            "aggregates calculated"
        );
        aggregates
    }
}

fn grouped_means<K: std::hash::Hash + Eq>(values: HashMap<K, Vec<f64>>) -> HashMap<K, f64> {
    values
        .into_iter()
        .map(|(key, vals)| {
            let m = mean(&vals).unwrap_or(f64::NAN);
            (key, m)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn reading(
        station: &str,
        sensor_id: u32,
        parameter: Pollutant,
        day: NaiveDate,
        hour: u32,
        value: f64,
    ) -> Reading {
        let local = day.and_hms_opt(hour, 0, 0).unwrap();
        Reading {
            value,
            parameter,
            city: "Roma".to_string(),
            station_name: station.to_string(),
            sensor_id,
            utc_datetime: Utc
                .with_ymd_and_hms(day.year(), day.month(), day.day(), hour, 0, 0)
                .unwrap(),
            local_datetime: local,
            day,
            weekday: day.weekday(),
            season: Season::from_date(day),
            year: day.year(),
        }
    }

    fn calculator() -> AggregateCalculator {
        AggregateCalculator::new(chrono_tz::UTC)
    }

    #[test]
    fn test_city_day_mean_weights_stations_equally() {
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let mut readings = vec![reading("A", 1, Pollutant::Pm10, day, 0, 10.0)];
        for h in 0..23 {
            readings.push(reading("B", 2, Pollutant::Pm10, day, h, 30.0));
        }

        let aggregates = calculator().calculate(&readings);
        let key = ("Roma".to_string(), Pollutant::Pm10, day);
        // Mean of per-station means (10 and 30), not of all 24 readings.
        assert_eq!(aggregates.city_daily[&key].mean, 20.0);
    }

    #[test]
    fn test_station_day_stats() {
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let readings = vec![
            reading("A", 1, Pollutant::No2, day, 0, 10.0),
            reading("A", 1, Pollutant::No2, day, 1, 20.0),
            reading("A", 1, Pollutant::No2, day, 2, 60.0),
        ];

        let aggregates = calculator().calculate(&readings);
        let key = ("Roma".to_string(), Pollutant::No2, "A".to_string(), day);
        let stats = aggregates.station_daily[&key];
        assert_eq!(stats.mean, 30.0);
        assert_eq!(stats.max, 60.0);
        assert_eq!(stats.median, 20.0);
    }

    #[test]
    fn test_median_hourly_is_cross_sensor() {
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let readings = vec![
            reading("A", 1, Pollutant::O3, day, 0, 10.0),
            reading("B", 2, Pollutant::O3, day, 0, 20.0),
            reading("C", 3, Pollutant::O3, day, 0, 90.0),
        ];

        let aggregates = calculator().calculate(&readings);
        let ts = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let key = ("Roma".to_string(), Pollutant::O3, ts);
        assert_eq!(aggregates.median_hourly[&key], 20.0);
    }

    #[test]
    fn test_mda8_only_for_mda8_pollutants() {
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let mut readings = Vec::new();
        for h in 0..24 {
            readings.push(reading("A", 1, Pollutant::O3, day, h, 60.0));
            readings.push(reading("A", 2, Pollutant::Pm10, day, h, 60.0));
        }

        let aggregates = calculator().calculate(&readings);
        assert_eq!(
            aggregates.mda8[&("Roma".to_string(), Pollutant::O3, day)],
            Some(60.0)
        );
        assert!(!aggregates
            .mda8
            .contains_key(&("Roma".to_string(), Pollutant::Pm10, day)));
    }

    #[test]
    fn test_annual_mean_over_distinct_days() {
        let parameter = Pollutant::Pm25;
        let mut readings = Vec::new();
        // Day one: 24 readings of 10. Day two: 1 reading of 30.
        let day1 = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap();
        for h in 0..24 {
            readings.push(reading("A", 1, parameter, day1, h, 10.0));
        }
        readings.push(reading("A", 1, parameter, day2, 0, 30.0));

        let aggregates = calculator().calculate(&readings);
        let key = ("Roma".to_string(), parameter, 2023);
        // Each day counts once: (10 + 30) / 2.
        assert_eq!(aggregates.annual_means[&key], 20.0);
    }
}
