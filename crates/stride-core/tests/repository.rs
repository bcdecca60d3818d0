//! Integration tests for the step repository.
//!
//! These run against the in-memory store, so no files are touched:
//! `cargo test --package stride-core --test repository`

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use stride_core::{
    DEFAULT_COLLECTION, Durability, Error, MemoryStore, PersistentStore, RepositoryOptions,
    StepRepository, Zone,
};

const DAY: i64 = 86_400;

/// Route repository logs to the test harness; `RUST_LOG=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn utc() -> RepositoryOptions {
    RepositoryOptions::new().zone(Zone::Utc)
}

fn midnight(y: i32, m: u32, d: u32) -> i64 {
    Zone::Utc
        .midnight_timestamp(NaiveDate::from_ymd_opt(y, m, d).unwrap())
        .unwrap()
}

#[tokio::test]
async fn test_single_day_total() {
    let repo = StepRepository::open(Arc::new(MemoryStore::new()), utc())
        .await
        .unwrap();

    repo.save_step(midnight(2024, 1, 1), 8000).await.unwrap();

    assert_eq!(repo.steps_for_day(midnight(2024, 1, 1)).await.unwrap(), 8000);
    assert_eq!(repo.steps_for_day(midnight(2024, 1, 2)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_first_week_of_january() {
    let repo = StepRepository::open(Arc::new(MemoryStore::new()), utc())
        .await
        .unwrap();

    for day in 1..=7 {
        repo.save_step(midnight(2024, 1, day) + 9 * 3600, 1000)
            .await
            .unwrap();
    }

    assert_eq!(repo.steps_for_week(midnight(2024, 1, 1)).await.unwrap(), 7000);
}

#[tokio::test]
async fn test_duplicate_day_rejected() {
    let repo = StepRepository::open(Arc::new(MemoryStore::new()), utc())
        .await
        .unwrap();

    repo.save_step(midnight(2024, 1, 1), 8000).await.unwrap();
    let err = repo
        .save_step(midnight(2024, 1, 1) + 3600, 500)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DuplicateDay { .. }));
    let log = repo.snapshot().await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log.get_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap()
            .steps(),
        8000
    );
}

#[tokio::test]
async fn test_storage_unavailable_keeps_session_totals() {
    init_tracing();
    let repo = StepRepository::open(Arc::new(MemoryStore::unavailable()), utc())
        .await
        .unwrap();
    assert_eq!(repo.durability(), Durability::Volatile);

    repo.save_step(midnight(2024, 1, 1), 8000).await.unwrap();
    repo.save_step(midnight(2024, 1, 2), 2000).await.unwrap();

    assert_eq!(repo.steps_for_day(midnight(2024, 1, 1)).await.unwrap(), 8000);
    assert_eq!(repo.steps_for_week(midnight(2024, 1, 1)).await.unwrap(), 10000);
    assert!(
        repo.save_step(midnight(2024, 1, 1), 1)
            .await
            .unwrap_err()
            .is_duplicate()
    );
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let store = Arc::new(MemoryStore::new());
    {
        let repo = StepRepository::open(store.clone(), utc()).await.unwrap();
        for day in 0..30 {
            repo.save_step(midnight(2024, 2, 1) + day * DAY, 100)
                .await
                .unwrap();
        }
    }

    let repo = StepRepository::open(store.clone(), utc()).await.unwrap();
    assert_eq!(repo.snapshot().await.unwrap().len(), 30);
    assert_eq!(repo.steps_for_year(midnight(2024, 6, 1)).await.unwrap(), 3000);
    assert_eq!(store.document_count(DEFAULT_COLLECTION).await, 30);
}

#[tokio::test]
async fn test_leap_day_year_totals() {
    let repo = StepRepository::open(Arc::new(MemoryStore::new()), utc())
        .await
        .unwrap();

    repo.save_step(midnight(2024, 2, 29) + 60, 5000).await.unwrap();
    repo.save_step(midnight(2023, 12, 31) + DAY - 1, 7).await.unwrap();
    repo.save_step(midnight(2025, 1, 1), 11).await.unwrap();

    assert_eq!(repo.steps_for_year(midnight(2024, 1, 1)).await.unwrap(), 5000);
    assert_eq!(repo.steps_for_year(midnight(2023, 1, 1)).await.unwrap(), 7);
    assert_eq!(repo.steps_for_year(midnight(2025, 1, 1)).await.unwrap(), 11);
}

#[tokio::test]
async fn test_concurrent_writers_same_day() {
    let store = Arc::new(MemoryStore::new());
    store.set_write_latency(Duration::from_millis(20));
    let repo = Arc::new(StepRepository::open(store.clone(), utc()).await.unwrap());

    let writers = (0..5).map(|i| {
        let repo = repo.clone();
        async move { repo.save_step(midnight(2024, 1, 1) + i * 60, 1000 + i).await }
    });
    let results = join_all(writers).await;

    let committed = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(e) if e.is_duplicate()))
        .count();
    assert_eq!(committed, 1);
    assert_eq!(duplicates, 4);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_concurrent_writers_distinct_days() {
    let repo = Arc::new(
        StepRepository::open(Arc::new(MemoryStore::new()), utc())
            .await
            .unwrap(),
    );

    let writers = (0..10).map(|i| {
        let repo = repo.clone();
        async move { repo.save_step(midnight(2024, 3, 1) + i * DAY, 100).await }
    });
    for result in join_all(writers).await {
        result.unwrap();
    }

    assert_eq!(repo.snapshot().await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_failed_write_then_retry() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let repo = StepRepository::open(store.clone(), utc()).await.unwrap();

    store.fail_next_writes(2);
    assert!(matches!(
        repo.save_step(midnight(2024, 5, 5), 10).await,
        Err(Error::Persistence { .. })
    ));
    assert!(matches!(
        repo.save_step(midnight(2024, 5, 5), 10).await,
        Err(Error::Persistence { .. })
    ));
    repo.save_step(midnight(2024, 5, 5), 10).await.unwrap();

    assert_eq!(store.list_all(DEFAULT_COLLECTION).await.unwrap().len(), 1);
    assert_eq!(repo.steps_for_day(midnight(2024, 5, 5)).await.unwrap(), 10);
}
