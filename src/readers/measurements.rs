use std::fs::File;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::models::RawReading;
use crate::utils::progress::ProgressReporter;

/// CSV reader for raw measurement exports. One file per location is the
/// usual layout, but any mix of files with the standard header works.
pub struct MeasurementReader {
    delimiter: u8,
}

impl MeasurementReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read one CSV file of raw readings.
    pub fn read_file(&self, path: &Path) -> Result<Vec<RawReading>> {
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(false)
            .from_reader(file);

        let mut readings = Vec::new();
        for row in reader.deserialize() {
            let reading: RawReading = row?;
            readings.push(reading);
        }
        debug!(path = %path.display(), rows = readings.len(), "file read");
        Ok(readings)
    }

    /// Read every `.csv` file under a directory, in name order so repeated
    /// runs see the same row order.
    pub fn read_dir(
        &self,
        dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<RawReading>> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "no .csv files in {}",
                dir.display()
            )));
        }

        let mut readings = Vec::new();
        for path in &paths {
            if let Some(p) = progress {
                p.set_message(&format!("Reading {}", path.display()));
            }
            readings.extend(self.read_file(path)?);
        }

        info!(
            files = paths.len(),
            rows = readings.len(),
            "measurement files read"
        );
        Ok(readings)
    }
}

impl Default for MeasurementReader {
    fn default() -> Self {
        Self::new()
    }
}
