//! # Conference Central Runtime
//!
//! Execution support shared by the record store backends and the application:
//!
//! - **Retry**: exponential backoff with jitter
//! - **Transaction runner**: re-runs an operation after optimistic commit conflicts
//! - **Metrics**: counter descriptions and a Prometheus exporter
//!
//! ## Example
//!
//! ```ignore
//! use conference_central_runtime::{RetryPolicy, run_in_transaction};
//!
//! let policy = RetryPolicy::default();
//! let registered = run_in_transaction(&store, &policy, |txn| async move {
//!     // read, check invariants, write
//!     Ok(true)
//! })
//! .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Retry logic with exponential backoff
pub mod retry;

/// Transaction runner with conflict retries
pub mod transaction;

/// Prometheus metrics for observability
pub mod metrics;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use transaction::{TransactionError, run_in_transaction};
