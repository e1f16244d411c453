//! Fakes for the injected collaborators.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use conference_central_core::environment::{Cache, CacheFuture, Notifier, Task};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Notifier that keeps every task it receives.
///
/// # Example
///
/// ```
/// use conference_central_core::environment::{Notifier, Task};
/// use conference_central_testing::RecordingNotifier;
///
/// let notifier = RecordingNotifier::new();
/// notifier.notify(Task::new("send_confirmation_email"));
///
/// assert_eq!(notifier.len(), 1);
/// assert_eq!(notifier.tasks_named("send_confirmation_email").len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    tasks: Arc<Mutex<Vec<Task>>>,
}

impl RecordingNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every task received so far, oldest first.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    /// Tasks with the given name.
    #[must_use]
    pub fn tasks_named(&self, name: &str) -> Vec<Task> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|task| task.name == name)
            .cloned()
            .collect()
    }

    /// Remove and return every recorded task.
    #[must_use]
    pub fn drain(&self) -> Vec<Task> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }

    /// Number of recorded tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Whether no task was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, task: Task) {
        self.tasks.lock().unwrap().push(task);
    }
}

/// `HashMap`-backed [`Cache`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently has a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().unwrap().contains_key(key)
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> CacheFuture<'_, Option<String>> {
        let value = self.entries.read().unwrap().get(key).cloned();
        Box::pin(async move { value })
    }

    fn set(&self, key: &str, value: String) -> CacheFuture<'_, ()> {
        self.entries.write().unwrap().insert(key.to_string(), value);
        Box::pin(async {})
    }

    fn delete(&self, key: &str) -> CacheFuture<'_, ()> {
        self.entries.write().unwrap().remove(key);
        Box::pin(async {})
    }
}
