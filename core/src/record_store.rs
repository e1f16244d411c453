//! Record store trait and typed helpers.
//!
//! The [`RecordStore`] trait is the contract both the allocation engine and the catalog
//! rely on: keyed reads and writes, id allocation, validated property queries and atomic
//! optimistic commits.
//!
//! # Implementations
//!
//! - `PostgresRecordStore` (in `conference-central-postgres`): production storage
//! - `InMemoryRecordStore` (in `conference-central-testing`): fast, deterministic tests
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so services can hold
//! an `Arc<dyn RecordStore>`. Generic, typed access lives in [`RecordStoreExt`].

use crate::entity::{Entity, Record, VersionedRecord};
use crate::error::StoreError;
use crate::key::{Key, Version};
use crate::query::Query;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`RecordStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// The read set and write set of a transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommitRequest {
    /// Every key the transaction read, with the version it saw (`None`: absent).
    pub reads: Vec<(Key, Option<Version>)>,
    /// Records to write if every read is still current.
    pub writes: Vec<Record>,
}

impl CommitRequest {
    /// Whether the commit has nothing to write.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// The version the transaction read for `key`, if it read it.
    #[must_use]
    pub fn read_version(&self, key: &Key) -> Option<Option<Version>> {
        self.reads
            .iter()
            .find(|(read, _)| read == key)
            .map(|(_, version)| *version)
    }
}

/// Storage for keyed JSON records.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; services share one store behind an `Arc`.
pub trait RecordStore: Send + Sync {
    /// Load one record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the backend fails.
    fn get(&self, key: &Key) -> StoreFuture<'_, Option<VersionedRecord>>;

    /// Load several records.
    ///
    /// The result is aligned with `keys`: position `i` holds the record for `keys[i]`, or
    /// `None` where no such record exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the backend fails.
    fn get_multi(&self, keys: &[Key]) -> StoreFuture<'_, Vec<Option<VersionedRecord>>>;

    /// Write a record outside any transaction (blind upsert).
    ///
    /// Returns the record's new version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the backend fails.
    fn put(&self, record: Record) -> StoreFuture<'_, Version>;

    /// Allocate a fresh numeric id for `kind` under `parent` and return the complete key.
    ///
    /// Allocated ids are never reused.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the backend fails.
    fn allocate_id(&self, kind: &str, parent: Option<&Key>) -> StoreFuture<'_, Key>;

    /// Run a property query.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidQuery`] if the query breaks the single-inequality rule
    /// - [`StoreError::DatabaseError`] if the backend fails
    fn run_query(&self, query: Query) -> StoreFuture<'_, Vec<Record>>;

    /// Atomically apply `request.writes` if every read in `request.reads` is still current.
    ///
    /// A key read as absent must still be absent. On any mismatch nothing is written.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConcurrencyConflict`] if a read is stale
    /// - [`StoreError::DatabaseError`] if the backend fails
    fn commit(&self, request: CommitRequest) -> StoreFuture<'_, ()>;
}

/// Typed access on top of [`RecordStore`].
pub trait RecordStoreExt: RecordStore {
    /// Load and decode one entity.
    ///
    /// # Errors
    ///
    /// Propagates store errors and decoding failures.
    fn get_entity<E: Entity>(
        &self,
        key: &Key,
    ) -> impl Future<Output = Result<Option<E>, StoreError>> + Send {
        async move {
            self.get(key)
                .await?
                .map(|found| E::from_record(found.record))
                .transpose()
        }
    }

    /// Load and decode several entities, aligned with `keys`.
    ///
    /// # Errors
    ///
    /// Propagates store errors and decoding failures.
    fn get_entities<E: Entity>(
        &self,
        keys: &[Key],
    ) -> impl Future<Output = Result<Vec<Option<E>>, StoreError>> + Send {
        async move {
            self.get_multi(keys)
                .await?
                .into_iter()
                .map(|found| found.map(|found| E::from_record(found.record)).transpose())
                .collect()
        }
    }

    /// Encode and write one entity outside any transaction.
    ///
    /// # Errors
    ///
    /// Propagates store errors and encoding failures.
    fn put_entity<E: Entity>(
        &self,
        entity: &E,
    ) -> impl Future<Output = Result<Version, StoreError>> + Send {
        async move {
            let record = entity.to_record()?;
            self.put(record).await
        }
    }

    /// Run a query and decode the results.
    ///
    /// # Errors
    ///
    /// Propagates store errors and decoding failures.
    fn query_entities<E: Entity>(
        &self,
        query: Query,
    ) -> impl Future<Output = Result<Vec<E>, StoreError>> + Send {
        async move {
            self.run_query(query)
                .await?
                .into_iter()
                .map(E::from_record)
                .collect()
        }
    }
}

impl<S: RecordStore + ?Sized> RecordStoreExt for S {}
