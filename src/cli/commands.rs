use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::cli::args::{Cli, Commands};
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::RawReading;
use crate::processors::pipeline::{Pipeline, PipelineOutput};
use crate::readers::MeasurementReader;
use crate::utils::progress::ProgressReporter;
use crate::writers::CsvWriter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            config,
            output_dir,
            max_workers,
        } => {
            let config = PipelineConfig::load(&config)?;
            configure_workers(max_workers)?;

            println!("Processing air quality data...");
            println!("Input: {}", input.display());
            println!("Output directory: {}", output_dir.display());
            println!(
                "Locations: {}, pollutants: {}, workers: {}",
                config.locations.len(),
                config.parameters.len(),
                max_workers
            );

            let output = run_pipeline(config, &input).await?;
            println!("\n{}", output.summary());

            let writer = CsvWriter::new(&output_dir);
            let written = writer.write_all(&output)?;
            println!("\nWritten files:");
            for path in written {
                println!("  {}", path.display());
            }
            println!("Processing complete!");
        }

        Commands::Validate { input, config } => {
            let config = PipelineConfig::load(&config)?;

            println!("Validating air quality data...");
            println!("Input: {}", input.display());

            let output = run_pipeline(config, &input).await?;
            println!("\n{}", output.cleaning.summary());

            let invalid_sensors = output.sensors.iter().filter(|s| !s.valid_sensor).count();
            if output.cleaning.excluded_rows() == 0 && invalid_sensors == 0 {
                println!("\nAll rows and sensors passed validation checks");
            } else {
                println!(
                    "\nExcluded rows: {}, invalid sensors: {} of {}",
                    output.cleaning.excluded_rows(),
                    invalid_sensors,
                    output.sensors.len()
                );
            }
            println!("Validation complete - no output files written");
        }

        Commands::Info {
            input,
            config,
            sample,
        } => {
            let config = PipelineConfig::load(&config)?;

            println!("Analyzing input: {}", input.display());
            let output = run_pipeline(config, &input).await?;

            println!("\n{}", output.summary());

            if sample > 0 {
                println!("\nPer-station value summaries (showing up to {sample}):");
                println!(
                    "{:<16} {:<6} {:<24} {:>8} {:>8} {:>8} {:>8}",
                    "city", "param", "station", "count", "mean", "median", "max"
                );
                for s in output.summaries.iter().take(sample) {
                    println!(
                        "{:<16} {:<6} {:<24} {:>8} {:>8.2} {:>8.2} {:>8.2}",
                        s.city, s.parameter, s.station_name, s.count, s.mean, s.median, s.max
                    );
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn configure_workers(max_workers: usize) -> Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .build_global()
        .map_err(|e| ProcessingError::Config(format!("worker pool: {e}")))
}

/// Reads the input off the async runtime, then runs the CPU-bound pipeline
/// on a blocking worker.
async fn run_pipeline(config: PipelineConfig, input: &Path) -> Result<PipelineOutput> {
    let progress = ProgressReporter::new_spinner("Reading measurements...", false);
    let raw = read_input(input.to_path_buf(), &progress).await?;
    progress.set_message("Running pipeline...");

    let pipeline = Pipeline::new(config)?;
    let output = tokio::task::spawn_blocking(move || pipeline.run(raw)).await??;
    progress.finish_with_message(&format!("Processed {} readings", output.enriched.len()));
    Ok(output)
}

async fn read_input(input: PathBuf, progress: &ProgressReporter) -> Result<Vec<RawReading>> {
    if input.is_dir() {
        let reader = MeasurementReader::new();
        progress.set_message(&format!("Reading directory {}", input.display()));
        tokio::task::spawn_blocking(move || reader.read_dir(&input, None)).await?
    } else {
        tokio::task::spawn_blocking(move || MeasurementReader::new().read_file(&input)).await?
    }
}
