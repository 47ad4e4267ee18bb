use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Hourly rolling means and validated daily maxima for one
/// (city, pollutant) partition.
#[derive(Debug, Clone, Default)]
pub struct Mda8Output {
    /// Trailing 8-hour mean on the strict hourly grid. `None` marks hours
    /// where fewer than 6 of the 8 window hours were observed.
    pub rolling: BTreeMap<DateTime<Utc>, Option<f64>>,
    /// Daily maximum of the rolling mean, keyed by local calendar day.
    /// `None` marks days that failed the 75% completeness rule; such days
    /// are present-but-undefined, never zero.
    pub mda8: BTreeMap<NaiveDate, Option<f64>>,
}

/// Minimum defined rolling hours for a day's MDA8 to be valid. Ceiling
/// rounding: 18 for both 24-hour and 23-hour (DST) days, 19 for 25-hour.
pub(crate) fn day_threshold(total_hours: usize) -> usize {
    (total_hours as f64 * 0.75).ceil() as usize
}

const WINDOW_HOURS: i64 = 8;
const MIN_WINDOW_OBSERVATIONS: usize = 6;

/// Computes the maximum daily 8-hour average over an hourly value series.
/// The series is resampled onto a strict hourly grid between its first and
/// last observation; missing hours stay explicit gaps, never interpolated.
pub struct Mda8Engine {
    tz: Tz,
}

impl Mda8Engine {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn compute(&self, series: &[(DateTime<Utc>, f64)]) -> Mda8Output {
        if series.is_empty() {
            return Mda8Output::default();
        }

        // Resample onto hour buckets, first observation wins on duplicates.
        let mut values: HashMap<i64, f64> = HashMap::new();
        let mut first = i64::MAX;
        let mut last = i64::MIN;
        for (ts, value) in series {
            let bucket = ts.timestamp().div_euclid(3600);
            values.entry(bucket).or_insert(*value);
            first = first.min(bucket);
            last = last.max(bucket);
        }

        // Trailing 8-hour mean, at least 6 of 8 hours observed.
        let mut rolling: BTreeMap<DateTime<Utc>, Option<f64>> = BTreeMap::new();
        let mut rolling_by_bucket: HashMap<i64, Option<f64>> = HashMap::new();
        for bucket in first..=last {
            let window_start = (bucket - WINDOW_HOURS + 1).max(first);
            let window: Vec<f64> = (window_start..=bucket)
                .filter_map(|b| values.get(&b).copied())
                .collect();
            let mean = if window.len() >= MIN_WINDOW_OBSERVATIONS {
                Some(window.iter().sum::<f64>() / window.len() as f64)
            } else {
                None
            };
            rolling.insert(bucket_to_utc(bucket), mean);
            rolling_by_bucket.insert(bucket, mean);
        }

        // Group grid hours by local calendar day; DST days have 23 or 25.
        let mut day_totals: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        let mut day_valid: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for bucket in first..=last {
            let local_day = bucket_to_utc(bucket).with_timezone(&self.tz).date_naive();
            *day_totals.entry(local_day).or_insert(0) += 1;
            if let Some(Some(mean)) = rolling_by_bucket.get(&bucket) {
                day_valid.entry(local_day).or_default().push(*mean);
            }
        }

        let mda8 = day_totals
            .into_iter()
            .map(|(day, total)| {
                let valid = day_valid.get(&day).map_or(0, Vec::len);
                let value = if valid >= day_threshold(total) {
                    day_valid[&day].iter().copied().reduce(f64::max)
                } else {
                    None
                };
                (day, value)
            })
            .collect();

        Mda8Output { rolling, mda8 }
    }
}

fn bucket_to_utc(bucket: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(bucket * 3600, 0).unwrap_or_default()
}
