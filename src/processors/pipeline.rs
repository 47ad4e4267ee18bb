use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};
use validator::Validate;

use crate::analyzers::{describe_raw, describe_readings, ComplianceEvaluator, ValueSummary};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::models::{
    CityQuality, ComplianceRecord, EnrichedReading, Pollutant, RawReading, Season,
    SensorQuality, StationExceedance, NOT_APPLICABLE,
};
use crate::processors::averages::AggregateCalculator;
use crate::processors::cleaning::{Cleaner, CleaningReport};
use crate::processors::quality_checker::QualityChecker;
use crate::processors::time_aggregator::TimeAggregator;

/// One row per (city, parameter, day): the de-duplicated daily table the
/// compliance evaluation reads from.
#[derive(Debug, Clone, Serialize)]
pub struct DailyRecord {
    pub city: String,
    pub parameter: Pollutant,
    pub day: NaiveDate,
    pub day_of_the_week: String,
    pub season: Season,
    pub year: i32,
    pub day_mean_value: f64,
    pub day_max_value: f64,
    pub day_median_value: f64,
    pub active_sensors: u32,
    pub quality_flag: String,
    pub mda8: Option<f64>,
}

/// Everything one pipeline run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub cleaning: CleaningReport,
    pub enriched: Vec<EnrichedReading>,
    pub daily: Vec<DailyRecord>,
    pub sensors: Vec<SensorQuality>,
    pub cities: Vec<CityQuality>,
    pub compliance: Vec<ComplianceRecord>,
    pub station_exceedances: Vec<StationExceedance>,
    /// Value distributions over the raw rows, before cleaning.
    pub raw_summaries: Vec<ValueSummary>,
    /// Value distributions over the filtered reading set.
    pub summaries: Vec<ValueSummary>,
}

impl PipelineOutput {
    pub fn summary(&self) -> String {
        format!(
            "{}\n\n=== Pipeline Output ===\n\
            Enriched readings: {}\n\
            Daily rows: {}\n\
            Sensors assessed: {}\n\
            City-years assessed: {}\n\
            Compliance groups: {}",
            self.cleaning.summary(),
            self.enriched.len(),
            self.daily.len(),
            self.sensors.len(),
            self.cities.len(),
            self.compliance.len(),
        )
    }
}

/// Runs the full stage chain: clean, attach temporal columns, assess
/// quality, aggregate, evaluate compliance, then join every group-level
/// result back to row level.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    tz: Tz,
}

impl Pipeline {
    /// Builds the pipeline, running the same fail-fast configuration checks
    /// as the file-load path so in-memory configs cannot reach the
    /// evaluator with a regulatory table missing.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        config.check_standards()?;
        let tz = config.timezone()?;
        Ok(Self { config, tz })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, raw: Vec<RawReading>) -> Result<PipelineOutput> {
        let total = raw.len();
        let raw: Vec<RawReading> = raw
            .into_iter()
            .filter(|r| self.config.locations.iter().any(|l| l == &r.city))
            .collect();
        if raw.len() < total {
            debug!(
                dropped = total - raw.len(),
                "readings outside configured locations dropped"
            );
        }

        let raw_summaries = describe_raw(&raw);

        let cleaner = Cleaner::new(&self.config)?;
        let (clean, cleaning) = cleaner.clean(raw);
        let readings = TimeAggregator::new().aggregate(clean);
        let quality = QualityChecker::new(&self.config.quality).check(readings);
        let aggregates = AggregateCalculator::new(self.tz).calculate(&quality.readings);

        let evaluator = ComplianceEvaluator::new(&self.config);
        let compliance = evaluator.evaluate(&aggregates, &quality);
        let station_exceedances = evaluator.station_exceedances(&aggregates);
        let summaries = describe_readings(&quality.readings);

        let mut enriched: Vec<EnrichedReading> = quality
            .readings
            .iter()
            .map(|r| self.enrich(r, &quality, &aggregates))
            .collect();
        enriched.sort_by(|a, b| {
            (&a.city, a.parameter, a.utc_datetime, &a.station_name, a.sensor_id).cmp(&(
                &b.city,
                b.parameter,
                b.utc_datetime,
                &b.station_name,
                b.sensor_id,
            ))
        });

        let daily = self.daily_table(&quality, &aggregates);

        info!(
            enriched = enriched.len(),
            daily = daily.len(),
            compliance = compliance.len(),
            "pipeline run complete"
        );

        Ok(PipelineOutput {
            cleaning,
            enriched,
            daily,
            sensors: quality.sensors,
            cities: quality.cities,
            compliance,
            station_exceedances,
            raw_summaries,
            summaries,
        })
    }

    fn enrich(
        &self,
        r: &crate::models::Reading,
        quality: &crate::processors::quality_checker::QualityOutcome,
        aggregates: &crate::processors::averages::Aggregates,
    ) -> EnrichedReading {
        let group = (r.city.clone(), r.parameter);
        let sensor_year = quality.sensor_year.get(&(r.sensor_id, r.year));
        let city_year = quality
            .city_year
            .get(&(group.0.clone(), group.1, r.year));
        let station_day = aggregates.station_daily.get(&(
            group.0.clone(),
            group.1,
            r.station_name.clone(),
            r.day,
        ));
        let city_day = aggregates
            .city_daily
            .get(&(group.0.clone(), group.1, r.day));
        let hour = hour_floor(r.utc_datetime);

        EnrichedReading {
            value: r.value,
            parameter: r.parameter,
            city: r.city.clone(),
            station_name: r.station_name.clone(),
            sensor_id: r.sensor_id,
            utc_datetime: r.utc_datetime,
            local_datetime: r.local_datetime,
            day: r.day,
            day_of_the_week: r.weekday_name().to_string(),
            season: r.season,
            year: r.year,
            sensor_percent_coverage_per_day: quality
                .sensor_day_coverage
                .get(&(r.sensor_id, r.day))
                .copied()
                .unwrap_or(0.0),
            mean_sensor_percent_coverage_per_day: sensor_year
                .map(|m| m.mean_daily_coverage)
                .unwrap_or(0.0),
            sensor_percent_coverage_per_year: sensor_year
                .map(|m| m.annual_coverage)
                .unwrap_or(0.0),
            valid_sensor: sensor_year.map(|m| m.valid).unwrap_or(false),
            active_sensors_per_day: quality
                .city_day_active
                .get(&(group.0.clone(), group.1, r.day))
                .copied()
                .unwrap_or(0),
            median_active_sensors_per_year: city_year
                .map(|m| m.median_active_sensors)
                .unwrap_or(0.0),
            percent_days_available_per_year: city_year
                .map(|m| m.percent_days_available)
                .unwrap_or(0.0),
            quality_flag: city_year
                .map(|m| m.flag.to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            day_mean_value_per_station: station_day.map(|s| s.mean).unwrap_or(f64::NAN),
            day_mean_value: city_day.map(|s| s.mean).unwrap_or(f64::NAN),
            day_max_value_per_station: station_day.map(|s| s.max).unwrap_or(f64::NAN),
            day_max_value: city_day.map(|s| s.max).unwrap_or(f64::NAN),
            day_median_value_per_station: station_day.map(|s| s.median).unwrap_or(f64::NAN),
            day_median_value: city_day.map(|s| s.median).unwrap_or(f64::NAN),
            mean_value_per_weekday: aggregates
                .weekday_means
                .get(&(group.0.clone(), group.1, r.weekday))
                .copied()
                .unwrap_or(f64::NAN),
            mean_value_per_season: aggregates
                .season_means
                .get(&(group.0.clone(), group.1, r.season))
                .copied()
                .unwrap_or(f64::NAN),
            mean_value_per_year: aggregates
                .annual_means
                .get(&(group.0.clone(), group.1, r.year))
                .copied()
                .unwrap_or(f64::NAN),
            median_hourly_value: aggregates
                .median_hourly
                .get(&(group.0.clone(), group.1, r.utc_datetime))
                .copied()
                .unwrap_or(r.value),
            rolling_8h_mean: aggregates
                .rolling_8h
                .get(&(group.0.clone(), group.1, hour))
                .copied()
                .flatten(),
            mda8: aggregates
                .mda8
                .get(&(group.0, group.1, r.day))
                .copied()
                .flatten(),
        }
    }

    fn daily_table(
        &self,
        quality: &crate::processors::quality_checker::QualityOutcome,
        aggregates: &crate::processors::averages::Aggregates,
    ) -> Vec<DailyRecord> {
        let mut keys: BTreeSet<(String, Pollutant, NaiveDate)> = BTreeSet::new();
        for r in &quality.readings {
            keys.insert((r.city.clone(), r.parameter, r.day));
        }

        keys.into_iter()
            .map(|(city, parameter, day)| {
                let stats = aggregates.city_daily.get(&(city.clone(), parameter, day));
                let city_year = quality.city_year.get(&(city.clone(), parameter, day.year()));
                DailyRecord {
                    day_of_the_week: crate::models::weekday_name(day.weekday()).to_string(),
                    season: Season::from_date(day),
                    year: day.year(),
                    day_mean_value: stats.map(|s| s.mean).unwrap_or(f64::NAN),
                    day_max_value: stats.map(|s| s.max).unwrap_or(f64::NAN),
                    day_median_value: stats.map(|s| s.median).unwrap_or(f64::NAN),
                    active_sensors: quality
                        .city_day_active
                        .get(&(city.clone(), parameter, day))
                        .copied()
                        .unwrap_or(0),
                    quality_flag: city_year
                        .map(|m| m.flag.to_string())
                        .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
                    mda8: aggregates
                        .mda8
                        .get(&(city.clone(), parameter, day))
                        .copied()
                        .flatten(),
                    city,
                    parameter,
                    day,
                }
            })
            .collect()
    }
}

/// Floors a timestamp to the hour grid the rolling-mean series lives on.
fn hour_floor(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp().div_euclid(3600) * 3600;
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(ts)
}
