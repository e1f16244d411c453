//! Process-wide cache backed by `moka`.

use conference_central_core::environment::{Cache, CacheFuture};
use moka::future::Cache as MokaInner;

/// Bounded in-memory [`Cache`] for precomputed strings (announcements, featured speaker).
///
/// Entries are evicted when the capacity is exceeded; readers fall back to their defaults
/// on a miss.
#[derive(Clone)]
pub struct MokaCache {
    inner: MokaInner<String, String>,
}

impl MokaCache {
    /// Create a cache holding at most `max_capacity` entries.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: MokaInner::builder().max_capacity(max_capacity).build(),
        }
    }
}

impl Cache for MokaCache {
    fn get(&self, key: &str) -> CacheFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move { self.inner.get(&key).await })
    }

    fn set(&self, key: &str, value: String) -> CacheFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move { self.inner.insert(key, value).await })
    }

    fn delete(&self, key: &str) -> CacheFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move { self.inner.invalidate(&key).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let cache = MokaCache::new(10);
        assert_eq!(cache.get("k").await, None);

        cache.set("k", "v".to_string()).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }
}
