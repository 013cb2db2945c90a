//! Combined CSV export.
//!
//! Records from every processed symbol are buffered for the whole run and
//! written once at the end, sorted by symbol then date, to
//! `{dir}/all_symbols_YYYYMMDD.csv`. A second run on the same day overwrites
//! that file.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::models::{StockRecord, RECORD_COLUMNS};

/// Run-lifetime accumulator for the combined export
#[derive(Debug)]
pub struct Exporter {
    output_dir: PathBuf,
    records: Vec<StockRecord>,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            records: Vec::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Append one symbol's validated records to the buffer
    pub fn add(&mut self, records: &[StockRecord], symbol: &str) {
        debug!("Buffered {} records for {}", records.len(), symbol);
        self.records.extend_from_slice(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StockRecord] {
        &self.records
    }

    /// Path of the export file for `date`
    pub fn file_path_for(&self, date: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("all_symbols_{}.csv", date.format("%Y%m%d")))
    }

    /// Write the buffer to today's export file
    pub fn export_combined(&mut self) -> Result<Option<PathBuf>> {
        self.export_combined_on(Local::now().date_naive())
    }

    /// Write the buffer to the export file dated `date` and empty it; `None` when there is nothing to write
    pub fn export_combined_on(&mut self, date: NaiveDate) -> Result<Option<PathBuf>> {
        if self.records.is_empty() {
            info!("No data to export");
            return Ok(None);
        }

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create export dir: {}", self.output_dir.display())
        })?;

        self.records
            .sort_by(|a, b| (&a.symbol, a.trade_date).cmp(&(&b.symbol, b.trade_date)));

        let path = self.file_path_for(date);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        writer.write_record(RECORD_COLUMNS)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush().context("failed to flush CSV writer")?;

        // Flushed rows are discarded; a failed write keeps them for a retry
        let written = std::mem::take(&mut self.records).len();
        info!("📁 All data exported to {} ({} rows)", path.display(), written);
        Ok(Some(path))
    }
}
