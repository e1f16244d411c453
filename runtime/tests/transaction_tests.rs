//! Tests for the transaction runner.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect
#![allow(clippy::panic)] // Tests fail loudly on unexpected variants

use conference_central_core::prelude::*;
use conference_central_runtime::{RetryPolicy, TransactionError, run_in_transaction};
use conference_central_testing::InMemoryRecordStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Seats {
    key: Key,
    available: i64,
}

impl Entity for Seats {
    const KIND: &'static str = "Seats";

    fn key(&self) -> &Key {
        &self.key
    }
}

fn fast_policy(max_retries: usize) -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(max_retries)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
        .build()
}

async fn setup(available: i64) -> (Arc<InMemoryRecordStore>, Arc<dyn RecordStore>, Key) {
    let memory = Arc::new(InMemoryRecordStore::new());
    let key = Key::new("Seats", "conf");
    memory
        .put_entity(&Seats { key: key.clone(), available })
        .await
        .unwrap();
    let store: Arc<dyn RecordStore> = memory.clone();
    (memory, store, key)
}

async fn take_seat(
    store: &Arc<dyn RecordStore>,
    policy: &RetryPolicy,
    key: &Key,
) -> Result<i64, TransactionError<String>> {
    run_in_transaction(store, policy, |txn| {
        let key = key.clone();
        async move {
            let mut seats: Seats = txn
                .get(&key)
                .await?
                .ok_or_else(|| TransactionError::Aborted("missing".to_string()))?;
            if seats.available <= 0 {
                return Err(TransactionError::Aborted("sold out".to_string()));
            }
            seats.available -= 1;
            txn.put(&seats).await?;
            Ok(seats.available)
        }
    })
    .await
}

/// Test 1: A successful operation commits exactly once.
#[tokio::test]
async fn test_commits_on_success() {
    let (memory, store, key) = setup(2).await;

    let left = take_seat(&store, &fast_policy(3), &key).await.unwrap();

    assert_eq!(left, 1);
    assert_eq!(memory.commit_count(), 1);
    let stored: Seats = memory.get_entity(&key).await.unwrap().unwrap();
    assert_eq!(stored.available, 1);
}

/// Test 2: An aborted operation writes nothing and is not retried.
#[tokio::test]
async fn test_abort_is_not_retried() {
    let (memory, store, key) = setup(0).await;
    let attempts = AtomicUsize::new(0);

    let result: Result<(), TransactionError<String>> =
        run_in_transaction(&store, &fast_policy(3), |txn| {
            attempts.fetch_add(1, Ordering::SeqCst);
            let key = key.clone();
            async move {
                let seats: Seats = txn.get(&key).await?.unwrap();
                txn.put(&seats).await?;
                Err(TransactionError::Aborted("nope".to_string()))
            }
        })
        .await;

    assert!(matches!(result, Err(TransactionError::Aborted(ref msg)) if msg == "nope"));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(memory.commit_count(), 0);
    assert_eq!(memory.version_of(&key), Some(Version::FIRST));
}

/// Test 3: A commit conflict re-runs the operation against fresh state.
#[tokio::test]
async fn test_conflict_is_retried_with_fresh_reads() {
    let (memory, store, key) = setup(5).await;
    let attempts = AtomicUsize::new(0);

    let left = run_in_transaction(&store, &fast_policy(3), |txn| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        let key = key.clone();
        let memory = memory.clone();
        async move {
            let mut seats: Seats = txn.get(&key).await?.unwrap();
            if attempt == 0 {
                // A concurrent writer sneaks in between our read and our commit.
                memory
                    .put_entity(&Seats { key: key.clone(), available: 3 })
                    .await?;
            }
            seats.available -= 1;
            txn.put(&seats).await?;
            Ok::<_, TransactionError<String>>(seats.available)
        }
    })
    .await
    .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(left, 2);
    assert_eq!(memory.conflict_count(), 1);
}

/// Test 4: Persistent conflicts exhaust the retry budget.
#[tokio::test]
async fn test_exhausted_after_max_retries() {
    let (memory, store, key) = setup(5).await;
    memory.inject_conflicts(10);

    let err = take_seat(&store, &fast_policy(2), &key).await.unwrap_err();

    assert!(matches!(err, TransactionError::Exhausted { attempts: 3 }));
    let stored: Seats = memory.get_entity(&key).await.unwrap().unwrap();
    assert_eq!(stored.available, 5);
}

/// Test 5: Concurrent writers never oversell.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_never_oversell() {
    let (memory, store, key) = setup(3).await;
    let policy = fast_policy(20);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let policy = policy.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            take_seat(&store, &policy, &key).await
        }));
    }

    let mut successes = 0;
    let mut sold_out = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(TransactionError::Aborted(msg)) if msg == "sold out" => sold_out += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(sold_out, 5);
    let stored: Seats = memory.get_entity(&key).await.unwrap().unwrap();
    assert_eq!(stored.available, 0);
}
