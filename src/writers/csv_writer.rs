use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::processors::pipeline::PipelineOutput;

/// Writes every pipeline output table as CSV into one directory.
pub struct CsvWriter {
    output_dir: PathBuf,
}

impl CsvWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write all tables. Returns the paths written, in write order.
    pub fn write_all(&self, output: &PipelineOutput) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut written = Vec::new();
        written.push(self.write_table("clean.csv", &output.enriched)?);
        written.push(self.write_table("daily_data.csv", &output.daily)?);
        written.push(self.write_table("sensors_quality.csv", &output.sensors)?);
        written.push(self.write_table("cities_quality.csv", &output.cities)?);
        written.push(self.write_table("compliance.csv", &output.compliance)?);
        written.push(
            self.write_table("station_exceedances.csv", &output.station_exceedances)?,
        );
        written.push(
            self.write_table("pre_cleaning_descriptive.csv", &output.raw_summaries)?,
        );
        written.push(self.write_table("processed_descriptive.csv", &output.summaries)?);
        written.push(self.write_cleaning_report(&output.cleaning)?);

        info!(
            dir = %self.output_dir.display(),
            files = written.len(),
            "output tables written"
        );
        Ok(written)
    }

    fn write_cleaning_report(
        &self,
        report: &crate::processors::cleaning::CleaningReport,
    ) -> Result<PathBuf> {
        let path = self.output_dir.join("cleaning_report.json");
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, report)
            .map_err(|e| crate::error::ProcessingError::InvalidFormat(e.to_string()))?;
        Ok(path)
    }

    fn write_table<T: Serialize>(&self, name: &str, records: &[T]) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        let mut writer = csv::Writer::from_path(&path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(path)
    }
}
