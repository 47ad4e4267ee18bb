use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::info;

use crate::config::QualityConfig;
use crate::models::{CityQuality, Pollutant, QualityFlag, Reading, SensorQuality};
use crate::utils::stats::{mean, median, round2};

pub type SensorDayKey = (u32, NaiveDate);
pub type SensorYearKey = (u32, i32);
pub type CityDayKey = (String, Pollutant, NaiveDate);
pub type CityYearKey = (String, Pollutant, i32);

const DAYS_PER_YEAR: f64 = 365.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Per-sensor annual coverage metrics, computed before any exclusion.
#[derive(Debug, Clone, Copy)]
pub struct SensorYearMetrics {
    pub mean_daily_coverage: f64,
    pub annual_coverage: f64,
    pub valid: bool,
}

/// Per-city annual coverage metrics, computed on the filtered set.
#[derive(Debug, Clone, Copy)]
pub struct CityYearMetrics {
    pub median_active_sensors: f64,
    pub percent_days_available: f64,
    pub flag: QualityFlag,
}

/// Everything the quality stage produces: the filtered reading set, the
/// summary tables, and the metric maps later stages join back onto rows.
#[derive(Debug)]
pub struct QualityOutcome {
    pub readings: Vec<Reading>,
    pub sensors: Vec<SensorQuality>,
    pub cities: Vec<CityQuality>,
    pub sensor_day_coverage: HashMap<SensorDayKey, f64>,
    pub sensor_year: HashMap<SensorYearKey, SensorYearMetrics>,
    pub city_day_active: HashMap<CityDayKey, u32>,
    pub city_year: HashMap<CityYearKey, CityYearMetrics>,
    pub excluded_rows: usize,
}

/// Computes coverage metrics, filters low-coverage sensors and sensor-days,
/// and assigns the per-(city, pollutant, year) confidence flag. This is the
/// only stage that excludes rows on coverage grounds.
pub struct QualityChecker<'a> {
    config: &'a QualityConfig,
}

impl<'a> QualityChecker<'a> {
    pub fn new(config: &'a QualityConfig) -> Self {
        Self { config }
    }

    pub fn check(&self, readings: Vec<Reading>) -> QualityOutcome {
        let total_rows = readings.len();

        // Distinct hours per sensor-day; coverage is hours present / 24.
        let mut hours_per_sensor_day: HashMap<SensorDayKey, HashSet<i64>> = HashMap::new();
        for r in &readings {
            hours_per_sensor_day
                .entry((r.sensor_id, r.day))
                .or_default()
                .insert(r.utc_datetime.timestamp());
        }
        let sensor_day_coverage: HashMap<SensorDayKey, f64> = hours_per_sensor_day
            .into_iter()
            .map(|(key, hours)| {
                (key, round2(hours.len() as f64 / HOURS_PER_DAY * 100.0))
            })
            .collect();

        // Per sensor-year: distinct days, and the coverage of each of them.
        let mut days_per_sensor_year: HashMap<SensorYearKey, HashSet<NaiveDate>> = HashMap::new();
        let mut sensor_identity: HashMap<SensorYearKey, (String, Pollutant, String)> =
            HashMap::new();
        for r in &readings {
            let key = (r.sensor_id, r.year);
            days_per_sensor_year.entry(key).or_default().insert(r.day);
            sensor_identity.entry(key).or_insert_with(|| {
                (r.city.clone(), r.parameter, r.station_name.clone())
            });
        }

        let mut sensor_year: HashMap<SensorYearKey, SensorYearMetrics> = HashMap::new();
        for (key, days) in &days_per_sensor_year {
            let daily: Vec<f64> = days
                .iter()
                .map(|day| sensor_day_coverage[&(key.0, *day)])
                .collect();
            let mean_daily_coverage = round2(mean(&daily).unwrap_or(0.0));
            let annual_coverage = round2(days.len() as f64 / DAYS_PER_YEAR * 100.0);
            let valid = annual_coverage >= self.config.valid_sensor_annual_min
                && mean_daily_coverage >= self.config.valid_sensor_daily_min;
            sensor_year.insert(
                *key,
                SensorYearMetrics {
                    mean_daily_coverage,
                    annual_coverage,
                    valid,
                },
            );
        }

        // Sensor-level filter first, then the independent sensor-day filter.
        // The order matters: it changes which readings feed the city metrics.
        let mut filtered = readings;
        if self.config.exclude_invalid_sensors {
            filtered.retain(|r| sensor_year[&(r.sensor_id, r.year)].valid);
        }
        if self.config.exclude_invalid_days {
            filtered
                .retain(|r| sensor_day_coverage[&(r.sensor_id, r.day)] >= self.config.valid_day_min);
        }

        // City metrics are recomputed on the filtered set.
        let mut sensors_per_city_day: HashMap<CityDayKey, HashSet<u32>> = HashMap::new();
        let mut days_per_city_year: HashMap<CityYearKey, HashSet<NaiveDate>> = HashMap::new();
        for r in &filtered {
            sensors_per_city_day
                .entry((r.city.clone(), r.parameter, r.day))
                .or_default()
                .insert(r.sensor_id);
            days_per_city_year
                .entry((r.city.clone(), r.parameter, r.year))
                .or_default()
                .insert(r.day);
        }
        let city_day_active: HashMap<CityDayKey, u32> = sensors_per_city_day
            .into_iter()
            .map(|(key, sensors)| (key, sensors.len() as u32))
            .collect();

        let mut city_year: HashMap<CityYearKey, CityYearMetrics> = HashMap::new();
        for (key, days) in &days_per_city_year {
            let active: Vec<f64> = days
                .iter()
                .map(|day| city_day_active[&(key.0.clone(), key.1, *day)] as f64)
                .collect();
            let median_active_sensors = median(&active).unwrap_or(0.0);
            let percent_days_available = round2(days.len() as f64 / DAYS_PER_YEAR * 100.0);
            let flag = self.flag(median_active_sensors, percent_days_available);
            city_year.insert(
                key.clone(),
                CityYearMetrics {
                    median_active_sensors,
                    percent_days_available,
                    flag,
                },
            );
        }

        let mut sensors: Vec<SensorQuality> = sensor_year
            .iter()
            .map(|(key, metrics)| {
                let (city, parameter, station_name) = sensor_identity[key].clone();
                SensorQuality {
                    year: key.1,
                    city,
                    parameter,
                    station_name,
                    sensor_id: key.0,
                    mean_sensor_percent_coverage_per_day: metrics.mean_daily_coverage,
                    sensor_percent_coverage_per_year: metrics.annual_coverage,
                    valid_sensor: metrics.valid,
                }
            })
            .collect();
        sensors.sort_by(|a, b| {
            (a.year, &a.city, a.parameter, &a.station_name, a.sensor_id).cmp(&(
                b.year,
                &b.city,
                b.parameter,
                &b.station_name,
                b.sensor_id,
            ))
        });

        let mut cities: Vec<CityQuality> = city_year
            .iter()
            .map(|(key, metrics)| CityQuality {
                city: key.0.clone(),
                year: key.2,
                parameter: key.1,
                median_active_sensors: metrics.median_active_sensors,
                percent_days_available: metrics.percent_days_available,
                flag: metrics.flag,
            })
            .collect();
        cities.sort_by(|a, b| {
            (&a.city, a.year, a.parameter).cmp(&(&b.city, b.year, b.parameter))
        });

        let excluded_rows = total_rows - filtered.len();
        info!(
            kept = filtered.len(),
            excluded = excluded_rows,
            sensors = sensors.len(),
            groups = cities.len(),
            "quality checks complete"
        );

        QualityOutcome {
            readings: filtered,
            sensors,
            cities,
            sensor_day_coverage,
            sensor_year,
            city_day_active,
            city_year,
            excluded_rows,
        }
    }

    /// Ordered flag rules, first match wins. The Low tier is deliberately an
    /// OR where the stricter tiers require both conditions.
    fn flag(&self, median_active_sensors: f64, percent_days_available: f64) -> QualityFlag {
        let f = &self.config.flags;
        let rules = [
            (
                median_active_sensors >= f.high_sensors && percent_days_available >= f.high_days,
                QualityFlag::High,
            ),
            (
                median_active_sensors >= f.medium_sensors
                    && percent_days_available >= f.medium_days,
                QualityFlag::Medium,
            ),
            (
                median_active_sensors >= f.low_sensors || percent_days_available >= f.low_days,
                QualityFlag::Low,
            ),
        ];
        rules
            .iter()
            .find(|(matched, _)| *matched)
            .map(|(_, flag)| *flag)
            .unwrap_or(QualityFlag::VeryLow)
    }
}
