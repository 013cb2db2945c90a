use anyhow::Result;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::{HistoryProvider, SymbolSource};
use crate::database::RecordStore;
use crate::date_range::DateRangeResolver;
use crate::exporter::Exporter;
use crate::models::{
    Config, DateRange, FieldValue, RawRow, RunSummary, SymbolOutcome, SymbolStatus,
    DEFAULT_BATCH_SIZE,
};
use crate::normalizer::{parse_date, parse_number, to_volume, MSE_DATE_FORMAT};
use crate::validator::validate;

/// Header label of the date column
pub const DATE_COLUMN: &str = "Date";

/// Header labels of the numeric columns, in record field order
pub const NUMERIC_COLUMNS: [&str; 8] = [
    "Last trade price",
    "Max",
    "Min",
    "Avg. Price",
    "%chg.",
    "Volume",
    "Turnover in BEST in denars",
    "Total turnover in denars",
];

const VOLUME_INDEX: usize = 5;

/// What one (symbol, year) page contributed
#[derive(Debug, Clone, PartialEq)]
pub enum YearFetch {
    Rows(Vec<RawRow>),
    /// No table, or a header without data rows
    Empty,
    Failed(String),
}

/// Drives the per-symbol fetch, validation and hand-off to both sinks
pub struct DataCollector {
    provider: Arc<dyn HistoryProvider>,
    store: Arc<dyn RecordStore>,
    exporter: Mutex<Exporter>,
    batch_size: usize,
    max_concurrent_symbols: usize,
}

impl DataCollector {
    /// Create a new data collector
    pub fn new(
        provider: Arc<dyn HistoryProvider>,
        store: Arc<dyn RecordStore>,
        exporter: Exporter,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            store,
            exporter: Mutex::new(exporter),
            batch_size: config.batch_size,
            max_concurrent_symbols: config.max_concurrent_symbols.max(1),
        }
    }

    /// Collector with default batching that processes one symbol at a time
    pub fn sequential(
        provider: Arc<dyn HistoryProvider>,
        store: Arc<dyn RecordStore>,
        exporter: Exporter,
    ) -> Self {
        Self {
            provider,
            store,
            exporter: Mutex::new(exporter),
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrent_symbols: 1,
        }
    }

    /// Discover symbols, collect each one and write the combined export.
    ///
    /// Only a discovery failure is returned as an error; everything after that
    /// is reported through the summary.
    pub async fn run_pipeline(
        &self,
        source: &dyn SymbolSource,
        resolver: &DateRangeResolver,
        max_symbols: Option<usize>,
    ) -> Result<RunSummary> {
        let start = Instant::now();

        info!("🔍 Getting stock symbols...");
        let mut symbols = source.list_symbols().await?;
        if let Some(limit) = max_symbols {
            symbols.truncate(limit);
            info!("🔢 Limiting to {} symbols", symbols.len());
        }
        info!("📊 Found {} symbols to process", symbols.len());

        let outcomes = self.collect_all(&symbols, resolver).await;

        let export_path = match self.finalize().await {
            Ok(path) => path,
            Err(e) => {
                error!("❌ Error exporting combined data to CSV: {:#}", e);
                None
            }
        };

        let mut summary = RunSummary::from_outcomes(outcomes, start.elapsed());
        summary.export_path = export_path.map(|p| p.display().to_string());
        Ok(summary)
    }

    /// Collect every symbol; outcomes come back in input order
    pub async fn collect_all(
        &self,
        symbols: &[String],
        resolver: &DateRangeResolver,
    ) -> Vec<SymbolOutcome> {
        let total = symbols.len();

        stream::iter(symbols.iter().enumerate())
            .map(|(index, symbol)| async move {
                info!("🔄 Processing symbol {}/{}: {}", index + 1, total, symbol);
                self.collect_symbol(symbol, resolver).await
            })
            .buffered(self.max_concurrent_symbols)
            .collect()
            .await
    }

    /// Resolve and process one symbol; never fails past this boundary
    pub async fn collect_symbol(&self, symbol: &str, resolver: &DateRangeResolver) -> SymbolOutcome {
        let Some(range) = resolver.resolve(symbol).await else {
            error!("❌ {}: could not resolve a date range", symbol);
            return SymbolOutcome::failed(symbol, "could not resolve a date range");
        };

        match AssertUnwindSafe(self.process_symbol(symbol, range))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("❌ Error processing data for {}: worker panicked", symbol);
                SymbolOutcome::failed(symbol, "processing panicked")
            }
        }
    }

    /// Fetch every year of `range`, validate once and hand valid rows to both sinks
    pub async fn process_symbol(&self, symbol: &str, range: DateRange) -> SymbolOutcome {
        let mut outcome = SymbolOutcome::new(symbol);
        outcome.years_requested = range.year_count();

        if range.is_empty() {
            info!("⚪ {}: empty year range {:?}, nothing to fetch", symbol, range);
            return outcome;
        }

        info!("📅 {}: fetching {} to {}", symbol, range.start_year, range.end_year);

        let mut rows = Vec::new();
        for year in range.years() {
            match self.fetch_year(symbol, year).await {
                YearFetch::Rows(year_rows) => {
                    debug!("{} {}: {} rows", symbol, year, year_rows.len());
                    rows.extend(year_rows);
                }
                YearFetch::Empty => debug!("{} {}: no data", symbol, year),
                YearFetch::Failed(reason) => {
                    warn!("⚠️ {} {}: fetch failed - {}", symbol, year, reason);
                    outcome.years_failed += 1;
                }
            }
        }
        outcome.rows_fetched = rows.len();

        let validation = validate(rows);
        outcome.rows_valid = validation.valid_count();
        outcome.rows_invalid = validation.invalid_count();

        let Some(valid) = validation.valid_records() else {
            outcome.status = match outcome.years_failed {
                0 => SymbolStatus::Empty,
                failed if failed == outcome.years_requested => SymbolStatus::Failed {
                    error: format!("all {} year requests failed", failed),
                },
                failed => SymbolStatus::Partial {
                    reason: format!("{} of {} year requests failed", failed, outcome.years_requested),
                },
            };
            info!("⚪ {}: no valid records", symbol);
            return outcome;
        };

        let report = self.store.batch_save(valid, self.batch_size).await;
        outcome.rows_saved = report.rows_saved;

        self.exporter.lock().await.add(valid, symbol);

        let mut problems = Vec::new();
        if outcome.years_failed > 0 {
            problems.push(format!(
                "{} of {} year requests failed",
                outcome.years_failed, outcome.years_requested
            ));
        }
        if let Some(failure) = &report.failure {
            problems.push(format!(
                "batch {} not saved: {}",
                failure.batch_index + 1,
                failure.message
            ));
        }

        outcome.status = if problems.is_empty() {
            SymbolStatus::Ok
        } else {
            SymbolStatus::Partial {
                reason: problems.join("; "),
            }
        };

        info!(
            "✅ {}: {} valid records, {} new in store, {} skipped",
            symbol, outcome.rows_valid, report.rows_saved, report.rows_skipped
        );
        outcome
    }

    /// Request one calendar year of history for `symbol`
    pub async fn fetch_year(&self, symbol: &str, year: i32) -> YearFetch {
        let (Some(from), Some(to)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) else {
            return YearFetch::Failed(format!("year {} is outside the supported calendar", year));
        };

        debug!("Fetching {} data for year {}", symbol, year);
        match self.provider.fetch_history_table(symbol, from, to).await {
            Ok(table) if table.len() > 1 => {
                let rows = assemble_rows(&table, symbol);
                if rows.is_empty() {
                    YearFetch::Empty
                } else {
                    YearFetch::Rows(rows)
                }
            }
            Ok(_) => YearFetch::Empty,
            Err(e) => YearFetch::Failed(format!("{:#}", e)),
        }
    }

    /// Flush the export buffer once
    pub async fn finalize(&self) -> Result<Option<PathBuf>> {
        self.exporter.lock().await.export_combined()
    }

    /// Records buffered for export so far
    pub async fn buffered_records(&self) -> usize {
        self.exporter.lock().await.len()
    }
}

/// Convert a history table (header row first) into raw rows for `symbol`.
///
/// Columns are located by header label. Missing numeric cells read as zero;
/// rows whose date does not parse are dropped.
pub fn assemble_rows(table: &[Vec<String>], symbol: &str) -> Vec<RawRow> {
    let Some((header, data)) = table.split_first() else {
        return Vec::new();
    };

    let position = |label: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(label))
    };
    let date_index = position(DATE_COLUMN);
    let numeric_indices: Vec<Option<usize>> = NUMERIC_COLUMNS.iter().map(|&label| position(label)).collect();

    let Some(date_index) = date_index else {
        warn!("{}: table has no '{}' column, skipping page", symbol, DATE_COLUMN);
        return Vec::new();
    };

    let mut rows = Vec::with_capacity(data.len());
    for cells in data {
        let date_text = cells.get(date_index).map(String::as_str).unwrap_or("");
        let Some(date) = parse_date(date_text, MSE_DATE_FORMAT) else {
            warn!("Error processing row for {}: unparseable date '{}'", symbol, date_text);
            continue;
        };

        let mut row: RawRow = Vec::with_capacity(2 + NUMERIC_COLUMNS.len());
        row.push(FieldValue::Date(date));
        row.push(FieldValue::Text(symbol.to_string()));
        for (i, index) in numeric_indices.iter().enumerate() {
            let number = parse_number(index.and_then(|idx| cells.get(idx)).map(String::as_str));
            row.push(if i == VOLUME_INDEX {
                FieldValue::Int(to_volume(number))
            } else {
                FieldValue::Float(number)
            });
        }
        rows.push(row);
    }

    rows
}
