//! In-memory record store.
//!
//! [`InMemoryRecordStore`] implements the full [`RecordStore`] contract on a `BTreeMap`:
//! versioned records, optimistic commits, and query evaluation with the same comparison
//! semantics as the `PostgreSQL` backend. It is fast and deterministic, which makes it the
//! default backend for tests and for running the demo without a database.

use conference_central_core::entity::{Record, VersionedRecord};
use conference_central_core::error::StoreError;
use conference_central_core::key::{Key, Version};
use conference_central_core::query::Query;
use conference_central_core::record_store::{CommitRequest, RecordStore, StoreFuture};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<Key, (Version, Value)>,
    next_id: i64,
    commits: u64,
    conflicts: u64,
    injected_conflicts: usize,
}

impl Inner {
    fn versioned(&self, key: &Key) -> Option<VersionedRecord> {
        self.records.get(key).map(|(version, properties)| VersionedRecord {
            record: Record::new(key.clone(), properties.clone()),
            version: *version,
        })
    }

    fn write(&mut self, record: Record) -> Version {
        let version = self
            .records
            .get(&record.key)
            .map_or(Version::FIRST, |(current, _)| current.next());
        self.records.insert(record.key, (version, record.properties));
        version
    }
}

/// In-memory [`RecordStore`] for tests and local runs.
///
/// Clones share the same data.
///
/// # Example
///
/// ```
/// use conference_central_core::prelude::*;
/// use conference_central_testing::InMemoryRecordStore;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), StoreError> {
/// let store = InMemoryRecordStore::new();
/// let key = store.allocate_id("Conference", None).await?;
/// store.put(Record::new(key.clone(), json!({ "name": "RustConf" }))).await?;
///
/// let found = store.get(&key).await?.unwrap();
/// assert_eq!(found.version, Version::FIRST);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::DatabaseError("in-memory store lock poisoned".to_string()))
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map_or(0, |inner| inner.records.len())
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current version of `key`, if stored.
    #[must_use]
    pub fn version_of(&self, key: &Key) -> Option<Version> {
        self.lock()
            .ok()
            .and_then(|inner| inner.records.get(key).map(|(version, _)| *version))
    }

    /// Number of successful commits.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.lock().map_or(0, |inner| inner.commits)
    }

    /// Number of commits rejected with a conflict.
    #[must_use]
    pub fn conflict_count(&self) -> u64 {
        self.lock().map_or(0, |inner| inner.conflicts)
    }

    /// Make the next `count` commits fail with a conflict, whatever they read.
    ///
    /// Lets tests drive the retry and exhaustion paths deterministically.
    pub fn inject_conflicts(&self, count: usize) {
        if let Ok(mut inner) = self.lock() {
            inner.injected_conflicts = count;
        }
    }

    /// Remove every record.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.records.clear();
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, key: &Key) -> StoreFuture<'_, Option<VersionedRecord>> {
        let key = key.clone();
        Box::pin(async move { Ok(self.lock()?.versioned(&key)) })
    }

    fn get_multi(&self, keys: &[Key]) -> StoreFuture<'_, Vec<Option<VersionedRecord>>> {
        let keys = keys.to_vec();
        Box::pin(async move {
            let inner = self.lock()?;
            Ok(keys.iter().map(|key| inner.versioned(key)).collect())
        })
    }

    fn put(&self, record: Record) -> StoreFuture<'_, Version> {
        Box::pin(async move { Ok(self.lock()?.write(record)) })
    }

    fn allocate_id(&self, kind: &str, parent: Option<&Key>) -> StoreFuture<'_, Key> {
        let kind = kind.to_string();
        let parent = parent.cloned();
        Box::pin(async move {
            let mut inner = self.lock()?;
            inner.next_id += 1;
            let id = inner.next_id;
            Ok(match parent {
                Some(parent) => parent.child(kind, id),
                None => Key::new(kind, id),
            })
        })
    }

    fn run_query(&self, query: Query) -> StoreFuture<'_, Vec<Record>> {
        Box::pin(async move {
            query.validate()?;
            let inner = self.lock()?;

            let mut matches: Vec<Record> = inner
                .records
                .iter()
                .filter(|(key, (_, properties))| query.matches(key, properties))
                .map(|(key, (_, properties))| Record::new(key.clone(), properties.clone()))
                .collect();
            drop(inner);

            // Stable sort keeps key order as the final tie-breaker.
            matches.sort_by(|a, b| query.compare(&a.properties, &b.properties));
            if let Some(limit) = query.limit {
                matches.truncate(limit);
            }
            Ok(matches)
        })
    }

    fn commit(&self, request: CommitRequest) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.lock()?;

            if inner.injected_conflicts > 0 {
                inner.injected_conflicts -= 1;
                inner.conflicts += 1;
                let key = request
                    .reads
                    .first()
                    .map(|(key, _)| key.clone())
                    .or_else(|| request.writes.first().map(|record| record.key.clone()))
                    .unwrap_or_else(|| Key::new("Injected", "conflict"));
                return Err(StoreError::ConcurrencyConflict {
                    key,
                    expected: None,
                    actual: None,
                });
            }

            for (key, expected) in &request.reads {
                let actual = inner.records.get(key).map(|(version, _)| *version);
                if actual != *expected {
                    inner.conflicts += 1;
                    return Err(StoreError::ConcurrencyConflict {
                        key: key.clone(),
                        expected: *expected,
                        actual,
                    });
                }
            }

            for record in request.writes {
                inner.write(record);
            }
            inner.commits += 1;
            Ok(())
        })
    }
}
