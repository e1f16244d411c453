//! Application wiring: store selection, engine, cache and catalog.

use crate::allocation::AllocationEngine;
use crate::cache::MokaCache;
use crate::catalog::CatalogService;
use crate::config::{Config, StoreBackend, StoreConfig};
use crate::tasks::TaskHandler;
use conference_central_core::environment::Notifier;
use conference_central_core::error::StoreError;
use conference_central_core::record_store::RecordStore;
use conference_central_postgres::PostgresRecordStore;
use conference_central_runtime::{RetryPolicy, retry_with_backoff};
#[cfg(feature = "memory-store")]
use conference_central_testing::InMemoryRecordStore;
use std::sync::Arc;

/// Fully wired application services.
#[derive(Clone)]
pub struct App {
    /// Catalog operations.
    pub catalog: Arc<CatalogService>,
    /// Handler for tasks the catalog enqueues.
    pub tasks: TaskHandler,
}

impl App {
    /// Build the services described by `config`, delivering tasks to `notifier`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the configured store cannot be reached or migrated.
    pub async fn build(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, StoreError> {
        let policy = config.transactions.retry_policy();
        let store = build_store(&config.store, &policy).await?;

        let engine = AllocationEngine::new(store, policy);
        let cache = Arc::new(MokaCache::new(config.cache.max_capacity));
        let catalog = Arc::new(CatalogService::new(
            engine,
            notifier,
            cache,
            config.catalog.clone(),
        ));

        Ok(Self {
            tasks: TaskHandler::new(Arc::clone(&catalog)),
            catalog,
        })
    }
}

/// Open the configured record store.
///
/// Postgres connections are retried with `policy` before giving up, then migrated.
///
/// # Errors
///
/// Returns [`StoreError::DatabaseError`] if Postgres cannot be reached or migrated, or if the
/// memory backend is selected in a build without the `memory-store` feature.
pub async fn build_store(
    config: &StoreConfig,
    policy: &RetryPolicy,
) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.backend {
        #[cfg(feature = "memory-store")]
        StoreBackend::Memory => {
            tracing::info!("Using in-memory record store");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        #[cfg(not(feature = "memory-store"))]
        StoreBackend::Memory => Err(StoreError::DatabaseError(
            "the memory store backend requires the memory-store feature".to_string(),
        )),
        StoreBackend::Postgres => {
            let store = retry_with_backoff(policy, || {
                PostgresRecordStore::connect(&config.database_url, config.max_connections)
            })
            .await?;
            store.migrate().await?;
            tracing::info!(max_connections = config.max_connections, "Connected to Postgres");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(all(test, feature = "memory-store"))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::UserIdentity;
    use conference_central_testing::RecordingNotifier;

    #[tokio::test]
    async fn default_config_runs_in_memory() {
        let notifier = Arc::new(RecordingNotifier::new());
        let app = App::build(&Config::default(), notifier).await.unwrap();

        let user = UserIdentity::new("u1", "u1@example.com", "Ursula");
        let profile = app.catalog.get_profile(&user).await.unwrap();
        assert_eq!(profile.display_name, "Ursula");
    }

    #[tokio::test]
    async fn memory_backend_is_available_with_default_features() {
        let store = build_store(&Config::default().store, &RetryPolicy::no_retry())
            .await
            .unwrap();
        let key = UserIdentity::new("u1", "u1@example.com", "Ursula").profile_key();
        assert!(store.get(&key).await.unwrap().is_none());
    }
}
