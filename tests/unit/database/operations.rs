//! Database operation tests

use pretty_assertions::assert_eq;

use crate::common::{init_fresh_test_database, logging, test_data};
use mse_stocks::database::RecordStore;

#[tokio::test]
async fn test_records_are_returned_oldest_first() {
    logging::init_test_logging();
    logging::log_test_step("Testing stored row order");

    let db = init_fresh_test_database().await.expect("Failed to create test database");
    let mut records = test_data::create_test_records("ALK", test_data::date(2023, 3, 1), 4);
    records.reverse();

    let report = db.manager.batch_save(&records, 1000).await;
    assert!(report.is_complete());
    assert_eq!(report.rows_saved, 4);

    let stored = db.manager.get_records("ALK").await.expect("Failed to read records");
    let dates: Vec<_> = stored.iter().map(|r| r.trade_date).collect();
    assert_eq!(
        dates,
        vec![
            test_data::date(2023, 3, 1),
            test_data::date(2023, 3, 2),
            test_data::date(2023, 3, 3),
            test_data::date(2023, 3, 4),
        ]
    );
}

#[tokio::test]
async fn test_count_records_per_symbol() {
    let db = init_fresh_test_database().await.expect("Failed to create test database");

    db.manager
        .batch_save(&test_data::create_test_records("ALK", test_data::date(2023, 1, 2), 3), 1000)
        .await;
    db.manager
        .batch_save(&test_data::create_test_records("KMB", test_data::date(2023, 1, 2), 2), 1000)
        .await;

    assert_eq!(db.manager.count_records(None).await.unwrap(), 5);
    assert_eq!(db.manager.count_records(Some("ALK")).await.unwrap(), 3);
    assert_eq!(db.manager.count_records(Some("KMB")).await.unwrap(), 2);
    assert_eq!(db.manager.count_records(Some("TTK")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_zero_batch_size_uses_default() {
    let db = init_fresh_test_database().await.expect("Failed to create test database");
    let records = test_data::create_test_records("ALK", test_data::date(2023, 1, 2), 7);

    let report = db.manager.batch_save(&records, 0).await;

    assert!(report.is_complete());
    assert_eq!(report.batches_committed, 1);
    assert_eq!(report.rows_saved, 7);
}

#[tokio::test]
async fn test_empty_input_commits_nothing() {
    let db = init_fresh_test_database().await.expect("Failed to create test database");

    let report = db.manager.batch_save(&[], 10).await;

    assert!(report.is_complete());
    assert_eq!(report.batches_committed, 0);
    assert_eq!(db.manager.count_records(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sqlite_prefix_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = format!("sqlite:{}", dir.path().join("prefixed.db").display());

    let manager = mse_stocks::database::DatabaseManager::new(&path)
        .await
        .expect("Failed to open prefixed path");

    assert_eq!(manager.count_records(None).await.unwrap(), 0);
    assert!(dir.path().join("prefixed.db").exists());
}
