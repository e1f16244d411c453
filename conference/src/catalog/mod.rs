//! Catalog service: profiles, conferences, sessions and cached announcements.
//!
//! The catalog validates input, maps forms to records and back, and delegates the
//! invariant-bearing work to the [`AllocationEngine`] (seat and wishlist changes) and the
//! [filter compiler](crate::filters). Side effects outside the store go through the
//! injected [`Notifier`] and [`Cache`].

mod announcements;
mod conferences;
mod profiles;
mod sessions;

pub use announcements::{
    ANNOUNCEMENT_PREFIX, ANNOUNCEMENTS_KEY, FEATURED_SPEAKER_KEY, NO_FEATURED_SPEAKER,
};

use crate::allocation::AllocationEngine;
use crate::config::CatalogConfig;
use crate::error::ConferenceError;
use crate::types::{Conference, Profile};
use conference_central_core::environment::{Cache, Notifier};
use conference_central_core::key::Key;
use conference_central_core::record_store::{RecordStore, RecordStoreExt};
use std::collections::HashMap;
use std::sync::Arc;

/// Entry point for every catalog operation.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn RecordStore>,
    engine: AllocationEngine,
    notifier: Arc<dyn Notifier>,
    cache: Arc<dyn Cache>,
    config: CatalogConfig,
}

impl CatalogService {
    /// Create a catalog on top of `engine`'s store.
    #[must_use]
    pub fn new(
        engine: AllocationEngine,
        notifier: Arc<dyn Notifier>,
        cache: Arc<dyn Cache>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            store: Arc::clone(engine.store()),
            engine,
            notifier,
            cache,
            config,
        }
    }

    /// The allocation engine used for seat and wishlist changes.
    #[must_use]
    pub const fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    /// Catalog settings.
    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    async fn load_conference(&self, key: &Key) -> Result<Conference, ConferenceError> {
        self.store
            .get_entity::<Conference>(key)
            .await?
            .ok_or_else(|| ConferenceError::NotFound(format!("No conference found with key: {key}")))
    }

    /// Display names of the conferences' organizers, keyed by user id.
    ///
    /// One batch lookup; organizers without a profile are simply absent from the map.
    async fn organizer_names(
        &self,
        conferences: &[Conference],
    ) -> Result<HashMap<String, String>, ConferenceError> {
        let mut user_ids: Vec<&str> = conferences
            .iter()
            .map(|conference| conference.organizer_user_id.as_str())
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let keys: Vec<Key> = user_ids.iter().map(|id| Profile::key_for(id)).collect();
        let profiles = self.store.get_entities::<Profile>(&keys).await?;
        Ok(user_ids
            .into_iter()
            .zip(profiles)
            .filter_map(|(id, profile)| profile.map(|p| (id.to_string(), p.display_name)))
            .collect())
    }
}
