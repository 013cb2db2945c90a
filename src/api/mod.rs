use anyhow::Result;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use std::collections::HashSet;
use std::num::NonZeroU32;

use crate::error::CollectorError;
use crate::normalizer::clean_symbol;

pub mod html;
pub mod mse_client;
pub use mse_client::MseClient;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request pacing for the exchange site; `0` requests per minute disables it
pub struct ApiRateLimiter {
    limiter: Option<DirectRateLimiter>,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(requests_per_minute)
            .map(|per_minute| RateLimiter::direct(Quota::per_minute(per_minute)));
        Self { limiter }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// Supplies the ordered set of symbols to collect
#[async_trait::async_trait]
pub trait SymbolSource: Send + Sync {
    async fn list_symbols(&self) -> Result<Vec<String>>;
}

/// Fetches one page of the symbol history table
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Raw table rows for `symbol` between `from` and `to`, header row first.
    /// An empty vector means the page had no table rows.
    async fn fetch_history_table(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Vec<String>>>;
}

/// Symbols given up front, e.g. on the command line
#[derive(Debug, Clone)]
pub struct StaticSymbols {
    symbols: Vec<String>,
}

impl StaticSymbols {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: dedupe_symbols(symbols),
        }
    }
}

#[async_trait::async_trait]
impl SymbolSource for StaticSymbols {
    async fn list_symbols(&self) -> Result<Vec<String>> {
        if self.symbols.is_empty() {
            return Err(CollectorError::Discovery("no symbols were given".to_string()).into());
        }
        Ok(self.symbols.clone())
    }
}

/// Clean, drop blanks and deduplicate while keeping first-seen order
pub fn dedupe_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .map(|s| clean_symbol(s.as_ref()))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
