//! Transactional seat and wishlist allocation.
//!
//! Every write here runs inside [`run_in_transaction`], which covers each record the
//! operation reads and writes:
//!
//! - seat registration: the caller's profile and the conference
//! - wishlist changes: the caller's profile
//!
//! Commit conflicts re-run the whole operation with backoff, so two registrations racing
//! for the last seat are linearized through the conference record: the loser re-reads
//! `seatsAvailable = 0` and fails with [`ConferenceError::Conflict`]. Callers observe either
//! full success or a clean failure; a profile updated without its conference is never
//! visible.
//!
//! [`run_in_transaction`]: conference_central_runtime::run_in_transaction

mod registration;
mod schedule;
mod wishlist;

use crate::error::ConferenceError;
use crate::types::{Profile, UserIdentity};
use conference_central_core::record_store::RecordStore;
use conference_central_core::transaction::Transaction;
use conference_central_runtime::{RetryPolicy, TransactionError};
use std::sync::Arc;

pub(crate) type TxnResult<T> = Result<T, TransactionError<ConferenceError>>;

/// Executes registration and wishlist operations against a record store.
#[derive(Clone)]
pub struct AllocationEngine {
    store: Arc<dyn RecordStore>,
    policy: RetryPolicy,
}

impl AllocationEngine {
    /// Create an engine retrying conflicts according to `policy`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Conflict retry policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

/// Load the caller's profile inside `txn`, buffering a fresh one if it does not exist yet.
///
/// The absent read is part of the read set, so two first-time requests by the same user
/// cannot both create the profile.
pub(crate) async fn load_or_create_profile(txn: &Transaction, user: &UserIdentity) -> TxnResult<Profile> {
    if let Some(profile) = txn.get::<Profile>(&user.profile_key()).await? {
        return Ok(profile);
    }
    let profile = Profile::new(user);
    txn.put(&profile).await?;
    tracing::debug!(user_id = %user.user_id, "Created profile");
    Ok(profile)
}

pub(crate) fn abort<T>(err: ConferenceError) -> TxnResult<T> {
    Err(TransactionError::Aborted(err))
}
