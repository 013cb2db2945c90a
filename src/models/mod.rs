use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CollectorError;

/// One trading day for one symbol, as persisted and exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(rename = "date")]
    pub trade_date: NaiveDate,
    pub symbol: String,
    pub last_trade_price: f64,
    pub max_price: f64,
    pub min_price: f64,
    pub avg_price: f64,
    pub change_percentage: f64,
    pub volume: i64,
    pub turnover_best: f64,
    pub total_turnover: f64,
}

/// Column order shared by the store and the combined export
pub const RECORD_COLUMNS: [&str; 10] = [
    "date",
    "symbol",
    "last_trade_price",
    "max_price",
    "min_price",
    "avg_price",
    "change_percentage",
    "volume",
    "turnover_best",
    "total_turnover",
];

/// A single typed cell of an assembled row, before validation
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Date(NaiveDate),
    Text(String),
    Float(f64),
    Int(i64),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// An assembled table row: expected to hold `RECORD_COLUMNS.len()` fields
pub type RawRow = Vec<FieldValue>;

impl StockRecord {
    /// Flatten back into the raw row shape the validator consumes
    pub fn to_raw_row(&self) -> RawRow {
        vec![
            FieldValue::Date(self.trade_date),
            FieldValue::Text(self.symbol.clone()),
            FieldValue::Float(self.last_trade_price),
            FieldValue::Float(self.max_price),
            FieldValue::Float(self.min_price),
            FieldValue::Float(self.avg_price),
            FieldValue::Float(self.change_percentage),
            FieldValue::Int(self.volume),
            FieldValue::Float(self.turnover_best),
            FieldValue::Float(self.total_turnover),
        ]
    }
}

/// Inclusive range of calendar years requested for one symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_year: i32,
    pub end_year: i32,
}

impl DateRange {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self { start_year, end_year }
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    pub fn is_empty(&self) -> bool {
        self.start_year > self.end_year
    }

    pub fn year_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            let span = i64::from(self.end_year) - i64::from(self.start_year) + 1;
            usize::try_from(span).unwrap_or(usize::MAX)
        }
    }
}

/// How the resolver picks each symbol's window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMode {
    /// Same fixed lookback for every symbol, every run
    #[default]
    FullRefetch,
    /// Start from the year of the last persisted day
    Incremental,
}

impl FromStr for FetchMode {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full-refetch" | "full_refetch" | "full" => Ok(FetchMode::FullRefetch),
            "incremental" => Ok(FetchMode::Incremental),
            other => Err(CollectorError::Config(format!(
                "unknown fetch mode '{}', expected full-refetch or incremental",
                other
            ))),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::FullRefetch => write!(f, "full-refetch"),
            FetchMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// Final state of one symbol's run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolStatus {
    /// Every fetched year parsed and every valid row was handed to the store
    Ok,
    /// Nothing to collect for this symbol
    Empty,
    /// Some rows made it, but a year fetch or a store batch failed
    Partial { reason: String },
    /// The symbol could not be processed at all
    Failed { error: String },
}

/// Per-symbol result aggregated into the run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub status: SymbolStatus,
    pub years_requested: usize,
    pub years_failed: usize,
    pub rows_fetched: usize,
    pub rows_valid: usize,
    pub rows_invalid: usize,
    pub rows_saved: u64,
}

impl SymbolOutcome {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            status: SymbolStatus::Empty,
            years_requested: 0,
            years_failed: 0,
            rows_fetched: 0,
            rows_valid: 0,
            rows_invalid: 0,
            rows_saved: 0,
        }
    }

    pub fn failed(symbol: &str, error: impl Into<String>) -> Self {
        Self {
            status: SymbolStatus::Failed { error: error.into() },
            ..Self::new(symbol)
        }
    }
}

/// Run-level summary printed by the driver
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_symbols: usize,
    pub total_records: usize,
    pub ok_symbols: usize,
    pub empty_symbols: usize,
    pub partial_symbols: usize,
    pub failed_symbols: usize,
    pub elapsed: Duration,
    pub export_path: Option<String>,
    pub outcomes: Vec<SymbolOutcome>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: Vec<SymbolOutcome>, elapsed: Duration) -> Self {
        let mut summary = RunSummary {
            total_symbols: outcomes.len(),
            total_records: 0,
            ok_symbols: 0,
            empty_symbols: 0,
            partial_symbols: 0,
            failed_symbols: 0,
            elapsed,
            export_path: None,
            outcomes: Vec::new(),
        };

        for outcome in &outcomes {
            summary.total_records += outcome.rows_valid;
            match outcome.status {
                SymbolStatus::Ok => summary.ok_symbols += 1,
                SymbolStatus::Empty => summary.empty_symbols += 1,
                SymbolStatus::Partial { .. } => summary.partial_symbols += 1,
                SymbolStatus::Failed { .. } => summary.failed_symbols += 1,
            }
        }
        summary.outcomes = outcomes;
        summary
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub base_url: String,
    pub export_dir: String,
    pub lookback_years: i32,
    pub batch_size: usize,
    pub fetch_mode: FetchMode,
    pub request_timeout_secs: u64,
    pub requests_per_minute: u32,
    pub max_concurrent_symbols: usize,
}

pub const DEFAULT_BASE_URL: &str = "https://www.mse.mk/en/stats/symbolhistory/";
pub const DEFAULT_LOOKBACK_YEARS: i32 = 10;
pub const DEFAULT_BATCH_SIZE: usize = 1000;

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "db/stocks.db".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            export_dir: "data/processed".to_string(),
            lookback_years: DEFAULT_LOOKBACK_YEARS,
            batch_size: DEFAULT_BATCH_SIZE,
            fetch_mode: FetchMode::FullRefetch,
            request_timeout_secs: 30,
            requests_per_minute: 0,
            max_concurrent_symbols: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unparseable numbers fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let fetch_mode = match lookup("FETCH_MODE") {
            Some(value) => value.parse::<FetchMode>()?,
            None => defaults.fetch_mode,
        };

        let base_url = lookup("MSE_BASE_URL").unwrap_or(defaults.base_url);
        url::Url::parse(&base_url).map_err(|e| {
            CollectorError::Config(format!("MSE_BASE_URL '{}' is not a valid URL: {}", base_url, e))
        })?;

        Ok(Config {
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            base_url,
            export_dir: lookup("EXPORT_DIR").unwrap_or(defaults.export_dir),
            lookback_years: parse_or(lookup("LOOKBACK_YEARS"), defaults.lookback_years),
            batch_size: parse_or(lookup("BATCH_SIZE"), defaults.batch_size),
            fetch_mode,
            request_timeout_secs: parse_or(lookup("REQUEST_TIMEOUT_SECS"), defaults.request_timeout_secs),
            requests_per_minute: parse_or(lookup("REQUESTS_PER_MINUTE"), defaults.requests_per_minute),
            max_concurrent_symbols: parse_or(lookup("MAX_CONCURRENT_SYMBOLS"), defaults.max_concurrent_symbols)
                .max(1),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
