use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    QueryBuilder, Row, Sqlite, SqlitePool,
};
use std::path::Path;
use tracing::{debug, error, info};

use crate::models::{StockRecord, DEFAULT_BATCH_SIZE, RECORD_COLUMNS};

/// SQLite's default cap on bound parameters in one statement
const SQLITE_MAX_VARIABLES: usize = 32_766;

/// Rows that fit in one INSERT without exceeding the bind limit
pub const MAX_ROWS_PER_STATEMENT: usize = SQLITE_MAX_VARIABLES / RECORD_COLUMNS.len();

/// A batch that could not be committed
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Zero-based index of the failing batch
    pub batch_index: usize,
    pub message: String,
}

/// Outcome of one `batch_save` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub batches_committed: usize,
    /// Rows actually inserted
    pub rows_saved: u64,
    /// Rows skipped because (symbol, date) was already stored
    pub rows_skipped: u64,
    /// Set when a batch failed; later batches were not attempted
    pub failure: Option<BatchFailure>,
}

impl SaveReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Append-only store for validated records
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert `records` in chunks of `batch_size`, one transaction per chunk
    async fn batch_save(&self, records: &[StockRecord], batch_size: usize) -> SaveReport;

    /// Most recent trade date stored for `symbol`
    async fn last_persisted_date(&self, symbol: &str) -> Result<Option<NaiveDate>>;
}

/// SQLite-backed record store
#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (or create) the database file and make sure the schema exists
    pub async fn new(database_path: &str) -> Result<Self> {
        let database_path = database_path.strip_prefix("sqlite:").unwrap_or(database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("💾 Connecting to database: {}", database_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        // Enable WAL mode for better concurrency
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;

        let manager = Self { pool };
        manager.create_tables().await?;
        Ok(manager)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date DATE NOT NULL,
                symbol TEXT NOT NULL CHECK (length(symbol) BETWEEN 1 AND 10),
                last_trade_price REAL,
                max_price REAL,
                min_price REAL,
                avg_price REAL,
                change_percentage REAL,
                volume INTEGER,
                turnover_best REAL,
                total_turnover REAL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_symbol_date ON stock_data (symbol, date)",
        )
        .execute(&self.pool)
        .await?;

        debug!("stock_data schema ready");
        Ok(())
    }

    /// Insert one chunk inside its own transaction, split into as many
    /// multi-row statements as the bind limit requires
    async fn save_batch(&self, batch: &[StockRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for rows in batch.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO stock_data (date, symbol, last_trade_price, max_price, min_price, \
                 avg_price, change_percentage, volume, turnover_best, total_turnover) ",
            );
            query.push_values(rows, |mut row, record| {
                row.push_bind(record.trade_date)
                    .push_bind(record.symbol.clone())
                    .push_bind(record.last_trade_price)
                    .push_bind(record.max_price)
                    .push_bind(record.min_price)
                    .push_bind(record.avg_price)
                    .push_bind(record.change_percentage)
                    .push_bind(record.volume)
                    .push_bind(record.turnover_best)
                    .push_bind(record.total_turnover);
            });
            query.push(" ON CONFLICT (symbol, date) DO NOTHING");

            match query.build().execute(&mut *tx).await {
                Ok(result) => inserted += result.rows_affected(),
                Err(e) => {
                    tx.rollback().await?;
                    return Err(e.into());
                }
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Number of stored rows, optionally for one symbol
    pub async fn count_records(&self, symbol: Option<&str>) -> Result<i64> {
        let count: i64 = match symbol {
            Some(symbol) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM stock_data WHERE symbol = ?")
                    .bind(symbol)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM stock_data")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    /// All stored rows for a symbol, oldest first
    pub async fn get_records(&self, symbol: &str) -> Result<Vec<StockRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT date, symbol, last_trade_price, max_price, min_price, avg_price,
                   change_percentage, volume, turnover_best, total_turnover
            FROM stock_data
            WHERE symbol = ?
            ORDER BY date ASC
            "#,
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(StockRecord {
                trade_date: row.try_get("date")?,
                symbol: row.try_get("symbol")?,
                last_trade_price: row.try_get("last_trade_price")?,
                max_price: row.try_get("max_price")?,
                min_price: row.try_get("min_price")?,
                avg_price: row.try_get("avg_price")?,
                change_percentage: row.try_get("change_percentage")?,
                volume: row.try_get("volume")?,
                turnover_best: row.try_get("turnover_best")?,
                total_turnover: row.try_get("total_turnover")?,
            });
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl RecordStore for DatabaseManager {
    async fn batch_save(&self, records: &[StockRecord], batch_size: usize) -> SaveReport {
        let batch_size = if batch_size == 0 { DEFAULT_BATCH_SIZE } else { batch_size };
        let mut report = SaveReport::default();

        for (index, batch) in records.chunks(batch_size).enumerate() {
            match self.save_batch(batch).await {
                Ok(inserted) => {
                    report.batches_committed += 1;
                    report.rows_saved += inserted;
                    report.rows_skipped += batch.len() as u64 - inserted;
                    debug!(
                        "Saved batch {} of {} rows ({} new). Total saved: {}",
                        index + 1,
                        batch.len(),
                        inserted,
                        report.rows_saved
                    );
                }
                Err(e) => {
                    error!("❌ Error in batch save (batch {}): {}", index + 1, e);
                    report.failure = Some(BatchFailure {
                        batch_index: index,
                        message: e.to_string(),
                    });
                    break;
                }
            }
        }

        report
    }

    async fn last_persisted_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        let last: Option<String> =
            sqlx::query_scalar("SELECT MAX(date) FROM stock_data WHERE symbol = ?")
                .bind(symbol)
                .fetch_one(&self.pool)
                .await?;

        match last {
            Some(value) => Ok(Some(NaiveDate::parse_from_str(&value, "%Y-%m-%d")?)),
            None => Ok(None),
        }
    }
}
