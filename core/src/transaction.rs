//! Optimistic transactions over a [`RecordStore`].
//!
//! A [`Transaction`] records the version of every key it reads and buffers every write.
//! [`Transaction::commit`] hands both sets to [`RecordStore::commit`], which applies the
//! writes only if no read record changed in the meantime. Partial writes are never
//! observable: either every buffered write lands or none does.
//!
//! Retrying after a conflict is the caller's job; see `run_in_transaction` in
//! `conference-central-runtime`.

use crate::entity::{Entity, Record};
use crate::error::StoreError;
use crate::key::{Key, Version};
use crate::record_store::{CommitRequest, RecordStore};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct TransactionState {
    reads: HashMap<Key, Option<Version>>,
    // Insertion order is kept so stores apply writes deterministically.
    writes: Vec<Record>,
    closed: bool,
}

/// A unit of atomic work against a record store.
///
/// Cloning is cheap; clones share the same read and write sets, which lets an async
/// closure own a handle while the runner keeps another for committing.
#[derive(Clone)]
pub struct Transaction {
    store: Arc<dyn RecordStore>,
    state: Arc<Mutex<TransactionState>>,
}

impl Transaction {
    /// Start a transaction.
    #[must_use]
    pub fn begin(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(TransactionState::default())),
        }
    }

    /// Read an entity inside the transaction.
    ///
    /// Buffered writes are visible to later reads of the same key. A key read twice must
    /// return the same version both times.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TransactionClosed`] after commit
    /// - [`StoreError::ConcurrencyConflict`] if a repeated read sees a newer version
    /// - store and decoding errors
    pub async fn get<E: Entity>(&self, key: &Key) -> Result<Option<E>, StoreError> {
        {
            let state = self.state.lock().await;
            if state.closed {
                return Err(StoreError::TransactionClosed);
            }
            if let Some(pending) = state.writes.iter().find(|record| &record.key == key) {
                return E::from_record(pending.clone()).map(Some);
            }
        }

        let found = self.store.get(key).await?;
        let version = found.as_ref().map(|found| found.version);

        let mut state = self.state.lock().await;
        match state.reads.entry(key.clone()) {
            Entry::Occupied(seen) => {
                if *seen.get() != version {
                    return Err(StoreError::ConcurrencyConflict {
                        key: key.clone(),
                        expected: *seen.get(),
                        actual: version,
                    });
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(version);
            }
        }
        drop(state);

        found.map(|found| E::from_record(found.record)).transpose()
    }

    /// Buffer a write. Nothing reaches the store until [`Transaction::commit`].
    ///
    /// # Errors
    ///
    /// - [`StoreError::TransactionClosed`] after commit
    /// - encoding errors
    pub async fn put<E: Entity>(&self, entity: &E) -> Result<(), StoreError> {
        let record = entity.to_record()?;
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(StoreError::TransactionClosed);
        }
        if let Some(pending) = state.writes.iter_mut().find(|r| r.key == record.key) {
            *pending = record;
        } else {
            state.writes.push(record);
        }
        Ok(())
    }

    /// Number of buffered writes.
    pub async fn pending_writes(&self) -> usize {
        self.state.lock().await.writes.len()
    }

    /// Commit the buffered writes.
    ///
    /// The transaction is closed afterwards whether or not the commit succeeded.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConcurrencyConflict`] if any read is stale
    /// - [`StoreError::TransactionClosed`] if already committed
    /// - store errors
    pub async fn commit(&self) -> Result<(), StoreError> {
        let request = {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(StoreError::TransactionClosed);
            }
            state.closed = true;
            let mut reads: Vec<_> = state.reads.drain().collect();
            reads.sort_by(|(a, _), (b, _)| a.cmp(b));
            CommitRequest {
                reads,
                writes: std::mem::take(&mut state.writes),
            }
        };

        self.store.commit(request).await
    }
}
