use chrono::{Datelike, Local, NaiveDate};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::database::RecordStore;
use crate::models::{DateRange, FetchMode};

/// Computes the year window requested for each symbol
pub struct DateRangeResolver {
    lookback_years: i32,
    mode: FetchMode,
    store: Option<Arc<dyn RecordStore>>,
}

impl DateRangeResolver {
    /// Fixed lookback window, identical for every symbol
    pub fn full_refetch(lookback_years: i32) -> Self {
        Self {
            lookback_years,
            mode: FetchMode::FullRefetch,
            store: None,
        }
    }

    /// Narrow the window to start at the year of the last stored day
    pub fn incremental(lookback_years: i32, store: Arc<dyn RecordStore>) -> Self {
        Self {
            lookback_years,
            mode: FetchMode::Incremental,
            store: Some(store),
        }
    }

    pub fn new(mode: FetchMode, lookback_years: i32, store: Arc<dyn RecordStore>) -> Self {
        match mode {
            FetchMode::FullRefetch => Self::full_refetch(lookback_years),
            FetchMode::Incremental => Self::incremental(lookback_years, store),
        }
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Window for `symbol` as of today's local date
    pub async fn resolve(&self, symbol: &str) -> Option<DateRange> {
        self.resolve_as_of(symbol, Local::now().date_naive()).await
    }

    /// Window for `symbol` as of `today`. `None` means the calendar arithmetic failed.
    pub async fn resolve_as_of(&self, symbol: &str, today: NaiveDate) -> Option<DateRange> {
        let end_year = today.year();
        let Some(start_year) = end_year.checked_sub(self.lookback_years.max(0)) else {
            warn!("{}: lookback of {} years underflows from {}", symbol, self.lookback_years, end_year);
            return None;
        };
        if NaiveDate::from_ymd_opt(start_year, 1, 1).is_none() {
            warn!("{}: start year {} is outside the supported calendar", symbol, start_year);
            return None;
        }

        let full = DateRange::new(start_year, end_year);
        let (FetchMode::Incremental, Some(store)) = (self.mode, &self.store) else {
            return Some(full);
        };

        match store.last_persisted_date(symbol).await {
            Ok(Some(last_date)) => {
                // The year holding the last stored day is requested again; the
                // store skips days it already has.
                let range = DateRange::new(full.start_year.max(last_date.year()), end_year);
                debug!("{}: last stored {}, resolved {:?}", symbol, last_date, range);
                Some(range)
            }
            Ok(None) => Some(full),
            Err(e) => {
                warn!("{}: could not read last stored date, using full window: {}", symbol, e);
                Some(full)
            }
        }
    }
}
