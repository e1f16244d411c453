//! Application error taxonomy.
//!
//! Every business-rule failure has its own variant so a boundary layer can map outcomes
//! through [`ConferenceError::kind`] without inspecting message text.

use crate::filters::FilterError;
use conference_central_core::error::StoreError;
use conference_central_runtime::TransactionError;
use thiserror::Error;

/// Errors returned by the allocation engine and the catalog service.
#[derive(Error, Debug)]
pub enum ConferenceError {
    /// Malformed or disallowed filter set.
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    /// Referenced conference, session or profile does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with current state (duplicate registration, no seats,
    /// duplicate or missing wishlist entry).
    #[error("{0}")]
    Conflict(String),

    /// Required input is missing or malformed.
    #[error("{0}")]
    BadRequest(String),

    /// The caller may not modify this record.
    #[error("{0}")]
    Forbidden(String),

    /// The store could not commit within the retry budget.
    #[error("Transaction failed to commit after {attempts} attempts")]
    TransactionFailure {
        /// Attempts made.
        attempts: usize,
    },

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse classification of a [`ConferenceError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ConferenceError::InvalidFilter`].
    InvalidFilter,
    /// See [`ConferenceError::NotFound`].
    NotFound,
    /// See [`ConferenceError::Conflict`].
    Conflict,
    /// See [`ConferenceError::BadRequest`].
    BadRequest,
    /// See [`ConferenceError::Forbidden`].
    Forbidden,
    /// See [`ConferenceError::TransactionFailure`].
    TransactionFailure,
    /// Store or other internal failure.
    Internal,
}

impl ConferenceError {
    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFilter(_) => ErrorKind::InvalidFilter,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::TransactionFailure { .. } => ErrorKind::TransactionFailure,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller can correct the request and try again.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidFilter
                | ErrorKind::NotFound
                | ErrorKind::Conflict
                | ErrorKind::BadRequest
                | ErrorKind::Forbidden
        )
    }
}

impl From<TransactionError<Self>> for ConferenceError {
    fn from(err: TransactionError<Self>) -> Self {
        match err {
            TransactionError::Aborted(inner) => inner,
            TransactionError::Store(store) => Self::Store(store),
            TransactionError::Exhausted { attempts } => Self::TransactionFailure { attempts },
        }
    }
}
