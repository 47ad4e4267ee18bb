use chrono::{Datelike, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use airq_processor::config::{FlagThresholds, QualityConfig};
use airq_processor::models::{Pollutant, Reading, Season};
use airq_processor::processors::quality_checker::QualityChecker;
use airq_processor::processors::Mda8Engine;

// Hourly readings for one city, several sensors, a stretch of days.
fn create_test_readings(sensor_count: usize, days: usize) -> Vec<Reading> {
    let mut readings = Vec::with_capacity(sensor_count * days * 24);
    for sensor in 1..=sensor_count {
        for day in 0..days {
            for hour in 0..24 {
                let utc = Utc
                    .with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
                    .unwrap()
                    + chrono::Duration::hours((day * 24 + hour) as i64);
                let local = utc.naive_utc();
                let date = local.date();
                readings.push(Reading {
                    value: 20.0 + (hour as f64) * 0.5 + (sensor as f64),
                    parameter: Pollutant::Pm10,
                    city: "Roma".to_string(),
                    station_name: format!("Test Station {}", sensor),
                    sensor_id: sensor as u32,
                    utc_datetime: utc,
                    local_datetime: local,
                    day: date,
                    weekday: date.weekday(),
                    season: Season::from_date(date),
                    year: date.year(),
                });
            }
        }
    }
    readings
}

fn quality_config() -> QualityConfig {
    QualityConfig {
        valid_sensor_annual_min: 60.0,
        valid_sensor_daily_min: 30.0,
        valid_day_min: 50.0,
        exclude_invalid_sensors: true,
        exclude_invalid_days: true,
        flags: FlagThresholds {
            high_sensors: 3.0,
            high_days: 90.0,
            medium_sensors: 2.0,
            medium_days: 75.0,
            low_sensors: 1.0,
            low_days: 50.0,
        },
    }
}

fn benchmark_quality_checker(c: &mut Criterion) {
    let config = quality_config();
    let mut group = c.benchmark_group("quality_checker");
    for days in [30, 90] {
        let readings = create_test_readings(5, days);
        group.bench_with_input(
            BenchmarkId::from_parameter(days),
            &readings,
            |b, readings| {
                b.iter(|| {
                    let checker = QualityChecker::new(&config);
                    let outcome = checker.check(readings.clone());
                    black_box(outcome.readings.len())
                })
            },
        );
    }
    group.finish();
}

fn benchmark_mda8_engine(c: &mut Criterion) {
    let engine = Mda8Engine::new(chrono_tz::Europe::Rome);
    let mut group = c.benchmark_group("mda8_engine");
    for days in [30, 365] {
        let series: Vec<_> = (0..days * 24)
            .map(|h| {
                let ts = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(h as i64);
                (ts, 80.0 + (h % 24) as f64 * 2.0)
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(days), &series, |b, series| {
            b.iter(|| {
                let output = engine.compute(series);
                black_box(output.mda8.len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_quality_checker, benchmark_mda8_engine);
criterion_main!(benches);
