//! In-memory stand-ins for the exchange and the store

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mse_stocks::api::HistoryProvider;
use mse_stocks::database::{RecordStore, SaveReport};
use mse_stocks::models::StockRecord;

/// What the fake exchange answers for one symbol
#[derive(Clone)]
pub enum FakeHistory {
    /// One data row per requested year, dated January 15th of that year
    OneRowPerYear(&'static str),
    /// A table with a header and no data rows
    HeaderOnly,
    /// Years that fail with a transport error; other years get one row
    FailingYears(Vec<i32>),
}

/// History provider that records every (symbol, year) request
#[derive(Default)]
pub struct FakeProvider {
    histories: HashMap<String, FakeHistory>,
    requests: Mutex<Vec<(String, i32)>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, symbol: &str, history: FakeHistory) -> Self {
        self.histories.insert(symbol.to_string(), history);
        self
    }

    pub fn requests(&self) -> Vec<(String, i32)> {
        self.requests.lock().unwrap().clone()
    }
}

fn one_row_table(year: i32, price: &str) -> Vec<Vec<String>> {
    let date = format!("01/15/{}", year);
    super::test_data::history_table(&[(date.as_str(), price)])
}

#[async_trait]
impl HistoryProvider for FakeProvider {
    async fn fetch_history_table(
        &self,
        symbol: &str,
        from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<Vec<String>>> {
        let year = from.year();
        self.requests.lock().unwrap().push((symbol.to_string(), year));

        match self.histories.get(symbol) {
            Some(FakeHistory::OneRowPerYear(price)) => Ok(one_row_table(year, price)),
            Some(FakeHistory::HeaderOnly) => Ok(super::test_data::history_table(&[])),
            Some(FakeHistory::FailingYears(years)) if years.contains(&year) => {
                Err(anyhow!("connection reset fetching {} {}", symbol, year))
            }
            Some(FakeHistory::FailingYears(_)) => Ok(one_row_table(year, "100.00")),
            None => Ok(Vec::new()),
        }
    }
}

/// Store wrapper that counts the batch_save calls reaching the inner store
pub struct CountingStore<S> {
    pub inner: Arc<S>,
    pub calls: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for CountingStore<S> {
    async fn batch_save(&self, records: &[StockRecord], batch_size: usize) -> SaveReport {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.batch_save(records, batch_size).await
    }

    async fn last_persisted_date(&self, symbol: &str) -> Result<Option<NaiveDate>> {
        self.inner.last_persisted_date(symbol).await
    }
}
