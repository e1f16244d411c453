//! Session wishlists.
//!
//! A wishlist has no capacity; the only rules are "no duplicate entries" and "entries must
//! name an existing session".

use super::{AllocationEngine, abort, load_or_create_profile};
use crate::error::ConferenceError;
use crate::types::{Session, UserIdentity};
use conference_central_core::key::Key;
use conference_central_core::record_store::RecordStoreExt;
use conference_central_runtime::metrics::AllocationMetrics;
use conference_central_runtime::run_in_transaction;

impl AllocationEngine {
    /// Add a session to the caller's wishlist.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the session does not exist
    /// - [`ConferenceError::Conflict`] if the session is already wishlisted
    /// - [`ConferenceError::TransactionFailure`] if the retry budget runs out
    pub async fn wishlist_add(
        &self,
        user: &UserIdentity,
        session_key: &Key,
    ) -> Result<bool, ConferenceError> {
        if self.store.get_entity::<Session>(session_key).await?.is_none() {
            return Err(ConferenceError::NotFound(format!(
                "No session found with key: {session_key}"
            )));
        }

        run_in_transaction(&self.store, &self.policy, move |txn| async move {
            let mut profile = load_or_create_profile(&txn, user).await?;
            if profile.has_wishlisted(session_key) {
                return abort(ConferenceError::Conflict(
                    "Session is already in your wishlist".to_string(),
                ));
            }
            profile.wishlist.push(session_key.clone());
            txn.put(&profile).await?;
            Ok(())
        })
        .await?;

        AllocationMetrics::record_wishlist_change("add");
        tracing::info!(user_id = %user.user_id, session = %session_key, "Session wishlisted");
        Ok(true)
    }

    /// Remove a session from the caller's wishlist and return the sessions still on it.
    ///
    /// Remaining entries are resolved with one batch lookup after the commit; entries whose
    /// session no longer exists are skipped.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::Conflict`] if the wishlist is empty or lacks the session
    /// - [`ConferenceError::TransactionFailure`] if the retry budget runs out
    pub async fn wishlist_remove(
        &self,
        user: &UserIdentity,
        session_key: &Key,
    ) -> Result<Vec<Session>, ConferenceError> {
        let remaining = run_in_transaction(&self.store, &self.policy, move |txn| async move {
            let mut profile = load_or_create_profile(&txn, user).await?;
            if profile.wishlist.is_empty() {
                return abort(ConferenceError::Conflict(
                    "Your wishlist is empty".to_string(),
                ));
            }
            let Some(position) = profile.wishlist.iter().position(|key| key == session_key)
            else {
                return abort(ConferenceError::Conflict(
                    "Session is not in your wishlist".to_string(),
                ));
            };

            profile.wishlist.remove(position);
            txn.put(&profile).await?;
            Ok(profile.wishlist)
        })
        .await?;

        AllocationMetrics::record_wishlist_change("remove");
        tracing::info!(
            user_id = %user.user_id,
            session = %session_key,
            remaining = remaining.len(),
            "Session removed from wishlist"
        );
        self.resolve_sessions(&remaining).await
    }

    /// Batch-load sessions, skipping keys with no stored session.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn resolve_sessions(&self, keys: &[Key]) -> Result<Vec<Session>, ConferenceError> {
        let sessions = self.store.get_entities::<Session>(keys).await?;
        Ok(sessions.into_iter().flatten().collect())
    }
}
