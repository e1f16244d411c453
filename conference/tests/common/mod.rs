//! Shared fixtures for the conference integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use conference_central::allocation::AllocationEngine;
use conference_central::catalog::CatalogService;
use conference_central::config::CatalogConfig;
use conference_central::forms::{ConferenceForm, SessionForm};
use conference_central::types::{
    CONFERENCE_KIND, Conference, Profile, SESSION_KIND, UserIdentity, parse_websafe_key,
};
use conference_central_core::key::Key;
use conference_central_core::record_store::{RecordStore, RecordStoreExt};
use conference_central_runtime::RetryPolicy;
use conference_central_testing::{InMemoryCache, InMemoryRecordStore, RecordingNotifier};
use std::sync::Arc;
use std::time::Duration;

/// Retries quickly so conflict tests stay fast.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(10)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
        .build()
}

pub fn user(id: &str) -> UserIdentity {
    UserIdentity::new(id, format!("{id}@example.com"), id.to_uppercase())
}

pub struct Fixture {
    pub store: Arc<InMemoryRecordStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub cache: Arc<InMemoryCache>,
    pub catalog: CatalogService,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_policy(fast_policy())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let cache = Arc::new(InMemoryCache::new());

        let dyn_store: Arc<dyn RecordStore> = store.clone();
        let engine = AllocationEngine::new(dyn_store, policy);
        let catalog = CatalogService::new(
            engine,
            notifier.clone(),
            cache.clone(),
            CatalogConfig::default(),
        );

        Self {
            store,
            notifier,
            cache,
            catalog,
        }
    }

    pub fn engine(&self) -> &AllocationEngine {
        self.catalog.engine()
    }

    /// Create a conference through the catalog and return its key.
    pub async fn conference(&self, organizer: &UserIdentity, name: &str, max_attendees: u32) -> Key {
        let form = ConferenceForm::default()
            .with_name(name)
            .with_max_attendees(max_attendees);
        let created = self
            .catalog
            .create_conference(organizer, &form)
            .await
            .unwrap();
        parse_websafe_key(&created.websafe_key.unwrap(), CONFERENCE_KIND).unwrap()
    }

    /// Create a session through the catalog and return its key.
    pub async fn session(
        &self,
        organizer: &UserIdentity,
        conference: &Key,
        form: SessionForm,
    ) -> Key {
        let created = self
            .catalog
            .create_session(organizer, &conference.to_urlsafe(), &form)
            .await
            .unwrap();
        parse_websafe_key(&created.websafe_key.unwrap(), SESSION_KIND).unwrap()
    }

    pub async fn stored_conference(&self, key: &Key) -> Conference {
        self.store
            .get_entity::<Conference>(key)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn stored_profile(&self, user: &UserIdentity) -> Option<Profile> {
        self.store
            .get_entity::<Profile>(&user.profile_key())
            .await
            .unwrap()
    }
}
