//! Seat registration and cancellation.

use super::{AllocationEngine, TxnResult, abort, load_or_create_profile};
use crate::error::ConferenceError;
use crate::types::{Conference, UserIdentity};
use conference_central_core::key::Key;
use conference_central_core::transaction::Transaction;
use conference_central_runtime::metrics::AllocationMetrics;
use conference_central_runtime::run_in_transaction;

impl AllocationEngine {
    /// Register the caller for a conference (`register = true`) or cancel a registration
    /// (`register = false`).
    ///
    /// Registration takes exactly one seat and appends the conference to the caller's
    /// attend list. Cancellation gives the seat back and returns `false` without error when
    /// the caller was not registered. A missing profile is created on the way.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - [`ConferenceError::Conflict`] if already registered or no seat is left
    /// - [`ConferenceError::TransactionFailure`] if the retry budget runs out
    pub async fn register_seat(
        &self,
        user: &UserIdentity,
        conference_key: &Key,
        register: bool,
    ) -> Result<bool, ConferenceError> {
        let result = run_in_transaction(&self.store, &self.policy, move |txn| async move {
            apply_registration(&txn, user, conference_key, register).await
        })
        .await
        .map_err(ConferenceError::from);

        let outcome = match (&result, register) {
            (Ok(true), true) => "registered",
            (Ok(true), false) => "cancelled",
            (Ok(false), _) => "not_registered",
            (Err(_), _) => "rejected",
        };
        AllocationMetrics::record_registration(outcome);

        match &result {
            Ok(changed) => tracing::info!(
                user_id = %user.user_id,
                conference = %conference_key,
                register,
                changed,
                "Registration processed"
            ),
            Err(error) => tracing::debug!(
                user_id = %user.user_id,
                conference = %conference_key,
                register,
                %error,
                "Registration rejected"
            ),
        }
        result
    }
}

async fn apply_registration(
    txn: &Transaction,
    user: &UserIdentity,
    conference_key: &Key,
    register: bool,
) -> TxnResult<bool> {
    let mut profile = load_or_create_profile(txn, user).await?;
    let Some(mut conference) = txn.get::<Conference>(conference_key).await? else {
        return abort(ConferenceError::NotFound(format!(
            "No conference found with key: {conference_key}"
        )));
    };

    if register {
        if profile.is_attending(conference_key) {
            return abort(ConferenceError::Conflict(
                "You have already registered for this conference".to_string(),
            ));
        }
        let Some(remaining) = conference.seats_available.checked_sub(1) else {
            return abort(ConferenceError::Conflict(
                "There are no seats available.".to_string(),
            ));
        };

        profile.conference_keys_to_attend.push(conference_key.clone());
        conference.seats_available = remaining;
    } else {
        let Some(position) = profile
            .conference_keys_to_attend
            .iter()
            .position(|key| key == conference_key)
        else {
            return Ok(false);
        };

        profile.conference_keys_to_attend.remove(position);
        conference.seats_available = conference.seats_available.saturating_add(1);
    }

    txn.put(&profile).await?;
    txn.put(&conference).await?;
    Ok(true)
}
