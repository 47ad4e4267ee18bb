use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "airq-processor")]
#[command(about = "Air quality measurement pipeline and EU limit evaluator")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline and write all output tables
    Run {
        #[arg(short, long, help = "Input CSV file or directory of CSV files")]
        input: PathBuf,

        #[arg(short, long, help = "Pipeline configuration file")]
        config: PathBuf,

        #[arg(
            short,
            long,
            default_value = "output",
            help = "Directory for output tables"
        )]
        output_dir: PathBuf,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Clean and assess the input without writing output tables
    Validate {
        #[arg(short, long, help = "Input CSV file or directory of CSV files")]
        input: PathBuf,

        #[arg(short, long, help = "Pipeline configuration file")]
        config: PathBuf,
    },

    /// Show cleaning diagnostics and per-station value summaries
    Info {
        #[arg(short, long, help = "Input CSV file or directory of CSV files")]
        input: PathBuf,

        #[arg(short, long, help = "Pipeline configuration file")]
        config: PathBuf,

        #[arg(short, long, default_value = "10", help = "Summary rows to show")]
        sample: usize,
    },
}
