//! Record store errors.

use crate::key::{Key, Version};
use crate::query::QueryError;
use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Optimistic concurrency conflict: a record read by a transaction changed before the
    /// transaction committed.
    ///
    /// `None` means the record did not exist. Conflicts are retryable: re-running the whole
    /// transaction reads the new state.
    #[error("Concurrency conflict on {key}: expected version {expected:?}, found {actual:?}")]
    ConcurrencyConflict {
        /// The record that changed.
        key: Key,
        /// The version the transaction read.
        expected: Option<Version>,
        /// The version found at commit time.
        actual: Option<Version>,
    },

    /// The query violates the store's indexing rules.
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// The transaction was already committed.
    #[error("Transaction already committed")]
    TransactionClosed,

    /// Database connection error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StoreError {
    /// Whether re-running the enclosing transaction may succeed.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}
