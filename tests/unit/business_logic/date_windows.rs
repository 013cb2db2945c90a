//! Year window selection against a real store

use chrono::Datelike;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use crate::common::{init_fresh_test_database, logging, test_data};
use mse_stocks::database::RecordStore;
use mse_stocks::date_range::DateRangeResolver;
use mse_stocks::models::{DateRange, FetchMode};

#[tokio::test]
async fn test_full_refetch_covers_lookback_plus_current_year() {
    logging::init_test_logging();
    let today = test_data::date(2025, 6, 1);

    let resolver = DateRangeResolver::full_refetch(10);
    let range = resolver.resolve_as_of("ALK", today).await;

    assert_eq!(range, Some(DateRange::new(2015, 2025)));
    assert_eq!(range.unwrap().year_count(), 11);
}

#[tokio::test]
async fn test_incremental_resumes_from_last_stored_year() {
    logging::init_test_logging();
    logging::log_test_step("Incremental window from stored history");

    let db = init_fresh_test_database().await.expect("Failed to create test database");
    let store = Arc::new(db.manager);
    let records = test_data::create_test_records("ALK", test_data::date(2021, 12, 20), 5);
    assert!(store.batch_save(&records, 100).await.is_complete());

    let resolver = DateRangeResolver::new(FetchMode::Incremental, 10, store.clone());
    assert_eq!(resolver.mode(), FetchMode::Incremental);

    let today = test_data::date(2025, 6, 1);
    assert_eq!(records.last().unwrap().trade_date.year(), 2021);
    assert_eq!(
        resolver.resolve_as_of("ALK", today).await,
        Some(DateRange::new(2021, 2025))
    );

    // A symbol with no history gets the full window
    assert_eq!(
        resolver.resolve_as_of("KMB", today).await,
        Some(DateRange::new(2015, 2025))
    );
}

#[tokio::test]
async fn test_full_refetch_mode_ignores_store() {
    let db = init_fresh_test_database().await.expect("Failed to create test database");
    let store = Arc::new(db.manager);
    let records = test_data::create_test_records("ALK", test_data::date(2024, 3, 1), 3);
    store.batch_save(&records, 100).await;

    let resolver = DateRangeResolver::new(FetchMode::FullRefetch, 2, store.clone());
    assert_eq!(
        resolver.resolve_as_of("ALK", test_data::date(2025, 1, 2)).await,
        Some(DateRange::new(2023, 2025))
    );
}

#[tokio::test]
async fn test_zero_lookback_is_current_year_only() {
    let resolver = DateRangeResolver::full_refetch(0);
    let range = resolver
        .resolve_as_of("ALK", test_data::date(2024, 2, 29))
        .await
        .expect("range should resolve");

    assert_eq!(range.years().collect::<Vec<_>>(), vec![2024]);
}
