//! # Conference Central Core
//!
//! Storage abstractions shared by every Conference Central crate.
//!
//! ## Core Concepts
//!
//! - **Key**: hierarchical record identity; parents express ownership and scope queries
//! - **Entity**: a domain type stored as a JSON record
//! - **Query**: kind + ancestor + property filters + sort orders, subject to the
//!   single-inequality rule
//! - **`RecordStore`**: keyed reads/writes, id allocation, queries and optimistic commits
//! - **Transaction**: read-set/write-set bookkeeping on top of a store
//! - **Environment**: injected collaborators (task notifier, cache)
//!
//! ## Example
//!
//! ```ignore
//! use conference_central_core::prelude::*;
//!
//! let txn = Transaction::begin(store.clone());
//! let mut conference: Conference = txn.get(&key).await?.ok_or(NotFound)?;
//! conference.seats_available -= 1;
//! txn.put(&conference).await?;
//! txn.commit().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entity;
pub mod environment;
pub mod error;
pub mod key;
pub mod query;
pub mod record_store;
pub mod transaction;

/// Commonly used items.
pub mod prelude {
    pub use crate::entity::{Entity, Record, VersionedRecord};
    pub use crate::environment::{Cache, Notifier, Task};
    pub use crate::error::StoreError;
    pub use crate::key::{Key, KeyError, KeyId, Version};
    pub use crate::query::{Direction, Operator, PropertyFilter, Query, QueryError, SortOrder};
    pub use crate::record_store::{CommitRequest, RecordStore, RecordStoreExt, StoreFuture};
    pub use crate::transaction::Transaction;
}
