//! # Conference Central Testing
//!
//! In-memory implementations of the storage contract and collaborator traits:
//!
//! - [`InMemoryRecordStore`]: versioned records, optimistic commits, query evaluation
//! - [`RecordingNotifier`]: captures dispatched tasks
//! - [`InMemoryCache`]: `HashMap`-backed cache
//!
//! ## Example
//!
//! ```ignore
//! use conference_central_testing::{InMemoryCache, InMemoryRecordStore, RecordingNotifier};
//!
//! #[tokio::test]
//! async fn registers_a_seat() {
//!     let store = Arc::new(InMemoryRecordStore::new());
//!     let engine = AllocationEngine::new(store.clone(), RetryPolicy::default());
//!     // ...
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// In-memory record store
pub mod record_store;

/// Mock implementations of collaborator traits
pub mod mocks;

pub use mocks::{InMemoryCache, RecordingNotifier};
pub use record_store::InMemoryRecordStore;
