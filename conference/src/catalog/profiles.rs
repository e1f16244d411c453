//! Profile reads and edits.

use super::CatalogService;
use crate::allocation::load_or_create_profile;
use crate::error::ConferenceError;
use crate::forms::{ProfileForm, ProfileMiniForm};
use crate::types::{Profile, UserIdentity};
use conference_central_core::record_store::RecordStoreExt;
use conference_central_runtime::{TransactionError, run_in_transaction};

impl CatalogService {
    /// The caller's profile, created with identity defaults on first access.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_profile(&self, user: &UserIdentity) -> Result<ProfileForm, ConferenceError> {
        let profile = self.profile_for(user).await?;
        Ok(ProfileForm::from(&profile))
    }

    /// Update the caller's display name and/or t-shirt size.
    ///
    /// Runs as a transaction so a concurrent registration or wishlist change on the same
    /// profile is never overwritten.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::TransactionFailure`] if the retry budget runs out
    /// - store failures
    pub async fn save_profile(
        &self,
        user: &UserIdentity,
        form: &ProfileMiniForm,
    ) -> Result<ProfileForm, ConferenceError> {
        let profile = run_in_transaction(
            self.engine.store(),
            self.engine.policy(),
            move |txn| async move {
                let mut profile = load_or_create_profile(&txn, user).await?;
                form.apply_to(&mut profile);
                txn.put(&profile).await?;
                Ok::<_, TransactionError<ConferenceError>>(profile)
            },
        )
        .await
        .map_err(ConferenceError::from)?;

        tracing::info!(user_id = %user.user_id, "Profile saved");
        Ok(ProfileForm::from(&profile))
    }

    /// Load the caller's profile, storing a fresh one if missing.
    pub(crate) async fn profile_for(&self, user: &UserIdentity) -> Result<Profile, ConferenceError> {
        if let Some(profile) = self.store.get_entity::<Profile>(&user.profile_key()).await? {
            return Ok(profile);
        }
        // Creation goes through a transaction so a racing first request is not clobbered.
        run_in_transaction(
            self.engine.store(),
            self.engine.policy(),
            move |txn| async move { load_or_create_profile(&txn, user).await },
        )
        .await
        .map_err(ConferenceError::from)
    }
}
