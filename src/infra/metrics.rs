// ============================================================
// Layer 6 - Metrics Sink
// ============================================================
// File-backed implementation of the MetricsSink port.
//
// Scalars are appended to a long-format CSV, one row per key,
// so every key shares the same step axis:
//
//   step,key,value
//   1,Epoch,1
//   1,Validation/Loss,7.012345
//   2,Epoch,1
//   2,Validation/Loss,6.998201
//   ...
//
// The qualitative example table is written once, at the end of
// the run, as examples.json.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::pair::ExampleRow;
use crate::domain::traits::MetricsSink;

pub const METRICS_FILE:  &str = "metrics.csv";
pub const EXAMPLES_FILE: &str = "examples.json";

/// Writes metrics.csv and examples.json into a run directory.
pub struct CsvMetrics {
    csv_path:      PathBuf,
    examples_path: PathBuf,
}

impl CsvMetrics {
    /// Create the sink, writing the CSV header if the file is new.
    ///
    /// An existing file is appended to, so a resumed run keeps one log.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join(METRICS_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,key,value")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path, examples_path: dir.join(EXAMPLES_FILE) })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

impl MetricsSink for CsvMetrics {
    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f64)]) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        let mut out = BufWriter::new(file);

        for (key, value) in scalars {
            writeln!(out, "{step},{key},{value:.6}")?;
        }
        out.flush()?;
        Ok(())
    }

    fn log_examples(&mut self, rows: &[ExampleRow]) -> Result<()> {
        let json = serde_json::to_string_pretty(rows)?;
        fs::write(&self.examples_path, json)
            .with_context(|| format!("Cannot write '{}'", self.examples_path.display()))?;
        tracing::info!("Wrote {} tracked examples to '{}'", rows.len(), self.examples_path.display());
        Ok(())
    }
}
