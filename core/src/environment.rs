//! Injected collaborators.
//!
//! Side effects that live outside the record store are modeled as traits so services can
//! be exercised without a live platform:
//!
//! - [`Notifier`]: fire-and-forget task dispatch (confirmation emails, featured-speaker
//!   recomputation)
//! - [`Cache`]: a best-effort key/string cache for precomputed reads

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

/// A named background task with string parameters.
///
/// # Examples
///
/// ```
/// use conference_central_core::environment::Task;
///
/// let task = Task::new("send_confirmation_email")
///     .with_param("email", "alice@example.com")
///     .with_param("body", "hello");
///
/// assert_eq!(task.param("email"), Some("alice@example.com"));
/// assert_eq!(task.param("missing"), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task name, used to route it to a handler.
    pub name: String,
    /// Parameters.
    pub params: BTreeMap<String, String>,
}

impl Task {
    /// Create a task without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Fire-and-forget task dispatch.
///
/// Delivery is at-least-once and callers never depend on the outcome, so `notify` cannot
/// fail; implementations log their own delivery problems.
pub trait Notifier: Send + Sync {
    /// Enqueue a task.
    fn notify(&self, task: Task);
}

/// Boxed future returned by [`Cache`] methods.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Process-wide best-effort string cache.
///
/// Entries may disappear at any time; readers must tolerate a miss.
pub trait Cache: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> CacheFuture<'_, Option<String>>;

    /// Store a value.
    fn set(&self, key: &str, value: String) -> CacheFuture<'_, ()>;

    /// Remove a value.
    fn delete(&self, key: &str) -> CacheFuture<'_, ()>;
}
