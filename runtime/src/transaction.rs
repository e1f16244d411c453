//! Transaction runner with conflict retries.
//!
//! [`run_in_transaction`] executes an async operation inside a fresh [`Transaction`],
//! commits it, and re-runs the whole operation when the commit hits an optimistic
//! concurrency conflict. Business errors abort without committing and are never retried.
//!
//! # Example
//!
//! ```ignore
//! let seats = run_in_transaction(&store, &policy, |txn| async move {
//!     let mut conference: Conference = txn
//!         .get(&key)
//!         .await?
//!         .ok_or_else(|| TransactionError::Aborted(ConferenceError::not_found(&key)))?;
//!     conference.seats_available -= 1;
//!     txn.put(&conference).await?;
//!     Ok(conference.seats_available)
//! })
//! .await?;
//! ```

use crate::metrics::TransactionMetrics;
use crate::retry::RetryPolicy;
use conference_central_core::error::StoreError;
use conference_central_core::record_store::RecordStore;
use conference_central_core::transaction::Transaction;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Outcome of a failed transactional operation.
#[derive(Error, Debug)]
pub enum TransactionError<E> {
    /// The operation decided not to commit.
    #[error("Transaction aborted: {0}")]
    Aborted(E),

    /// The store failed for a reason other than a conflict.
    #[error(transparent)]
    Store(StoreError),

    /// Every attempt ended in a commit conflict.
    #[error("Transaction failed to commit after {attempts} attempts")]
    Exhausted {
        /// Attempts made, including the first.
        attempts: usize,
    },
}

impl<E> From<StoreError> for TransactionError<E> {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Run `operation` in a transaction, retrying on commit conflicts.
///
/// Each attempt gets a fresh [`Transaction`]. The operation's buffered writes are committed
/// when it returns `Ok`. A conflict, whether detected while reading or at commit, sleeps
/// according to `policy` and starts over; any other error is returned immediately.
///
/// # Errors
///
/// - [`TransactionError::Aborted`] when the operation aborts
/// - [`TransactionError::Store`] on a non-conflict store failure
/// - [`TransactionError::Exhausted`] when `policy.max_retries` retries all conflicted
pub async fn run_in_transaction<F, Fut, T, E>(
    store: &Arc<dyn RecordStore>,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, TransactionError<E>>
where
    F: FnMut(Transaction) -> Fut,
    Fut: Future<Output = Result<T, TransactionError<E>>>,
    E: fmt::Display,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        let txn = Transaction::begin(Arc::clone(store));
        let result = match operation(txn.clone()).await {
            Ok(value) => txn.commit().await.map(|()| value).map_err(TransactionError::from),
            Err(err) => Err(err),
        };

        match result {
            Ok(value) => {
                TransactionMetrics::record_commit(started.elapsed());
                if attempt > 0 {
                    tracing::debug!(attempt, "Transaction committed after retry");
                }
                return Ok(value);
            }
            Err(TransactionError::Store(err)) if err.is_conflict() => {
                TransactionMetrics::record_conflict();
                if attempt >= policy.max_retries {
                    TransactionMetrics::record_exhausted();
                    tracing::error!(attempt, error = %err, "Transaction retries exhausted");
                    return Err(TransactionError::Exhausted {
                        attempts: attempt + 1,
                    });
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Transaction conflict, retrying..."
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
