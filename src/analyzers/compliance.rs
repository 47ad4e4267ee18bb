use std::collections::HashSet;

use chrono::Datelike;
use tracing::info;

use crate::config::PipelineConfig;
use crate::models::{
    ComplianceRecord, Pollutant, StationExceedance, Verdict, NOT_APPLICABLE,
};
use crate::processors::averages::Aggregates;
use crate::processors::quality_checker::QualityOutcome;
use crate::utils::stats::round2;

/// How many consecutive years of data the MDA8 exceedance average spans.
const MDA8_AVERAGING_YEARS: i32 = 3;

/// Ordered three-tier rule evaluation, first match wins. The boundary is
/// inclusive: a value exactly equal to the target limit is Good.
fn tiered_verdict(value: f64, current: Option<f64>, target: f64) -> Verdict {
    let rules = [
        (current.is_some_and(|c| value > c), Verdict::Critical),
        (value > target, Verdict::Problematic),
    ];
    rules
        .iter()
        .find(|(matched, _)| *matched)
        .map(|(_, verdict)| *verdict)
        .unwrap_or(Verdict::Good)
}

fn percent_above(value: f64, limit: f64, regime: &str) -> String {
    format!(
        "{:.2}% above {} standards",
        (value / limit - 1.0) * 100.0,
        regime
    )
}

/// Classifies each (city, pollutant, year) group against the current and
/// 2030 regulatory regimes.
pub struct ComplianceEvaluator<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ComplianceEvaluator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        aggregates: &Aggregates,
        quality: &QualityOutcome,
    ) -> Vec<ComplianceRecord> {
        let mut keys: Vec<_> = aggregates.annual_means.keys().cloned().collect();
        keys.sort();

        let records: Vec<ComplianceRecord> = keys
            .into_iter()
            .map(|(city, parameter, year)| {
                self.evaluate_group(aggregates, quality, &city, parameter, year)
            })
            .collect();

        info!(groups = records.len(), "compliance table built");
        records
    }

    fn evaluate_group(
        &self,
        aggregates: &Aggregates,
        quality: &QualityOutcome,
        city: &str,
        parameter: Pollutant,
        year: i32,
    ) -> ComplianceRecord {
        let yearly_mean = round2(aggregates.annual_means[&(city.to_string(), parameter, year)]);
        let city_metrics = quality
            .city_year
            .get(&(city.to_string(), parameter, year));

        let mut record = ComplianceRecord {
            city: city.to_string(),
            parameter,
            year,
            yearly_mean,
            current_annual_limit: None,
            target_annual_limit: None,
            annual_verdict: None,
            annual_compliance: NOT_APPLICABLE.to_string(),
            percent_above_current: NOT_APPLICABLE.to_string(),
            percent_above_target: NOT_APPLICABLE.to_string(),
            daily_limit_value: None,
            days_above_limit: None,
            current_days_limit: None,
            target_days_limit: None,
            days_verdict: None,
            days_compliance: NOT_APPLICABLE.to_string(),
            quality_flag: city_metrics
                .map(|m| m.flag.to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            median_active_sensors: city_metrics.map(|m| m.median_active_sensors),
            percent_days_available: city_metrics.map(|m| m.percent_days_available),
        };

        if parameter.uses_mda8() {
            self.evaluate_mda8_days(aggregates, city, parameter, year, &mut record);
        } else {
            self.evaluate_annual_mean(parameter, yearly_mean, &mut record);
            self.evaluate_exceedance_days(aggregates, city, parameter, year, &mut record);
        }

        record
    }

    /// Annual-mean verdict for the annually regulated pollutants.
    fn evaluate_annual_mean(
        &self,
        parameter: Pollutant,
        yearly_mean: f64,
        record: &mut ComplianceRecord,
    ) {
        // Presence is guaranteed by the startup standards check.
        let current = self.config.standards.current_annual[&parameter];
        let target = self.config.standards.target_annual[&parameter];

        let verdict = tiered_verdict(yearly_mean, Some(current), target);
        record.current_annual_limit = Some(current);
        record.target_annual_limit = Some(target);
        record.annual_verdict = Some(verdict);
        record.annual_compliance = verdict.describe(false);
        record.percent_above_current = match verdict {
            Verdict::Critical => percent_above(yearly_mean, current, "current"),
            _ => "Below current standards".to_string(),
        };
        record.percent_above_target = match verdict {
            Verdict::Good => "Below 2030 standards".to_string(),
            _ => percent_above(yearly_mean, target, "2030"),
        };
    }

    /// Exceedance-day verdict from daily city means.
    fn evaluate_exceedance_days(
        &self,
        aggregates: &Aggregates,
        city: &str,
        parameter: Pollutant,
        year: i32,
        record: &mut ComplianceRecord,
    ) {
        let daily = self.config.standards.daily[&parameter];
        let days_above = aggregates
            .city_daily
            .iter()
            .filter(|((c, p, day), stats)| {
                c == city && *p == parameter && day.year() == year && stats.mean > daily.limit
            })
            .count();

        let verdict = tiered_verdict(
            days_above as f64,
            daily.current_days.map(f64::from),
            f64::from(daily.target_days),
        );
        record.daily_limit_value = Some(daily.limit);
        record.days_above_limit = Some(days_above as f64);
        record.current_days_limit = daily.current_days;
        record.target_days_limit = Some(daily.target_days);
        record.days_verdict = Some(verdict);
        record.days_compliance = verdict.describe(daily.current_days.is_none());
    }

    /// MDA8 exceedance days averaged over a literal 3-year window, only
    /// computed once the three consecutive years all have data.
    fn evaluate_mda8_days(
        &self,
        aggregates: &Aggregates,
        city: &str,
        parameter: Pollutant,
        year: i32,
        record: &mut ComplianceRecord,
    ) {
        let daily = self.config.standards.daily[&parameter];
        record.daily_limit_value = Some(daily.limit);
        record.current_days_limit = daily.current_days;
        record.target_days_limit = Some(daily.target_days);

        let years_with_data: HashSet<i32> = aggregates
            .annual_means
            .keys()
            .filter(|(c, p, _)| c == city && *p == parameter)
            .map(|(_, _, y)| *y)
            .collect();
        let window: Vec<i32> = (year - MDA8_AVERAGING_YEARS + 1..=year).collect();
        if !window.iter().all(|y| years_with_data.contains(y)) {
            return;
        }

        let exceedances = aggregates
            .mda8
            .iter()
            .filter(|((c, p, day), value)| {
                c == city
                    && *p == parameter
                    && window.contains(&day.year())
                    && value.is_some_and(|v| v > daily.limit)
            })
            .count();
        let days_above =
            (exceedances as f64 / MDA8_AVERAGING_YEARS as f64 * 10.0).round() / 10.0;

        let verdict = tiered_verdict(
            days_above,
            daily.current_days.map(f64::from),
            f64::from(daily.target_days),
        );
        record.days_above_limit = Some(days_above);
        record.days_verdict = Some(verdict);
        record.days_compliance = verdict.describe(daily.current_days.is_none());
    }

    /// Per-station exceedance days for the quality deep-dive. MDA8
    /// pollutants are excluded: MDA8 is not defined per station.
    pub fn station_exceedances(&self, aggregates: &Aggregates) -> Vec<StationExceedance> {
        let mut counts: std::collections::HashMap<(String, Pollutant, i32, String), u32> =
            std::collections::HashMap::new();
        for ((city, parameter, station, day), stats) in &aggregates.station_daily {
            if parameter.uses_mda8() {
                continue;
            }
            let Some(daily) = self.config.standards.daily.get(parameter) else {
                continue;
            };
            let key = (city.clone(), *parameter, day.year(), station.clone());
            let entry = counts.entry(key).or_insert(0);
            if stats.mean > daily.limit {
                *entry += 1;
            }
        }

        let mut rows: Vec<StationExceedance> = counts
            .into_iter()
            .map(
                |((city, parameter, year, station_name), exceedance_days)| StationExceedance {
                    city,
                    parameter,
                    year,
                    station_name,
                    exceedance_days,
                },
            )
            .collect();
        rows.sort_by(|a, b| {
            (&a.city, a.parameter, a.year, &a.station_name).cmp(&(
                &b.city,
                b.parameter,
                b.year,
                &b.station_name,
            ))
        });
        rows
    }
}
