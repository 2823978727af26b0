//! Read-through and invalidation over the configured stores

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::cache::{Cache, TagSet, TaggedCache};
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheStoreManager;
use crate::infrastructure::metrics;

/// Wraps the cache backend for the query layer.
///
/// Tag support is detected on every call because the active store may be
/// swapped at runtime.
#[derive(Debug, Clone)]
pub struct CacheGateway {
    stores: Arc<CacheStoreManager>,
}

impl CacheGateway {
    pub fn new(stores: Arc<CacheStoreManager>) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &CacheStoreManager {
        &self.stores
    }

    /// Returns the cached value for `key`, or runs `compute` and stores its result.
    ///
    /// Backend failures never fail the read: an unreadable cache runs `compute`
    /// directly, a failed write still returns the computed value, and an
    /// undecodable payload counts as a miss. Errors from `compute` propagate.
    /// A zero `ttl` skips the store entirely.
    #[instrument(level = "debug", skip(self, tags, compute), fields(tags = tags.len()))]
    pub async fn read_through<T, F, Fut>(
        &self,
        store: Option<&str>,
        key: &str,
        tags: &TagSet,
        ttl: Duration,
        compute: F,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, DomainError>> + Send,
    {
        if ttl.is_zero() {
            debug!(key = %key, "Zero TTL, not caching");
            return compute().await;
        }

        let backend = self.stores.store_for(store);
        let label = if backend.as_taggable().is_some() { "tagged" } else { "plain" };

        // Pinned before the lookup: a flush during compute must orphan the write
        let entry_key = match backend.as_taggable() {
            Some(taggable) => match TaggedCache::new(taggable, tags).scoped_key(key).await {
                Ok(scoped) => scoped,
                Err(e) => {
                    warn!(key = %key, error = %e, "Tag versions unavailable, querying data store directly");
                    metrics::record_cache_error("read");
                    return compute().await;
                }
            },
            None => key.to_string(),
        };

        match backend.get_raw(&entry_key).await {
            Ok(Some(payload)) => match serde_json::from_str::<T>(&payload) {
                Ok(value) => {
                    debug!(key = %key, backend = label, "Cache hit");
                    metrics::record_cache_hit(label);
                    return Ok(value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    metrics::record_cache_error("decode");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, querying data store directly");
                metrics::record_cache_error("read");
                return compute().await;
            }
        }

        debug!(key = %key, backend = label, "Cache miss");
        metrics::record_cache_miss(label);

        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(payload) => {
                if let Err(e) = backend.set_raw(&entry_key, &payload, ttl).await {
                    warn!(key = %key, error = %e, "Failed to store query result");
                    metrics::record_cache_error("write");
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize query result");
                metrics::record_cache_error("serialize");
            }
        }

        Ok(value)
    }

    /// Flushes the given tags in every configured store.
    ///
    /// An entry lives in the store of the model that was read, but its tags may
    /// name related models on other stores, so no store can be skipped. Stores
    /// without tag support are cleared entirely. Returns false if any store failed.
    #[instrument(skip(self, tags), fields(tags = tags.len()))]
    pub async fn invalidate(&self, tags: &TagSet) -> bool {
        let stores = self.stores.all();
        let results = join_all(stores.iter().map(|store| flush_store(store.as_ref(), tags))).await;

        let mut flushed = true;
        for (scope, result) in results {
            metrics::record_invalidation(scope, result.is_ok());
            if let Err(e) = result {
                warn!(scope = scope, error = %e, "Cache invalidation failed");
                flushed = false;
            }
        }

        if flushed {
            info!(stores = stores.len(), tags = ?tags.as_slice(), "Cache invalidated");
        }

        flushed
    }

    /// Flushes every configured store concurrently
    #[instrument(skip(self))]
    pub async fn invalidate_all(&self) -> bool {
        let stores = self.stores.all();
        let results = join_all(stores.iter().map(|store| store.clear())).await;

        let mut flushed = true;
        for result in results {
            if let Err(e) = result {
                warn!(error = %e, "Cache flush failed");
                flushed = false;
            }
        }

        metrics::record_invalidation("all", flushed);

        if flushed {
            info!("All cache stores flushed");
        }

        flushed
    }
}

/// Tag flush on a taggable store, full clear otherwise
async fn flush_store(store: &dyn Cache, tags: &TagSet) -> (&'static str, Result<(), DomainError>) {
    match store.as_taggable() {
        Some(taggable) => ("tags", TaggedCache::new(taggable, tags).flush().await),
        None => ("all", store.clear().await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::infrastructure::cache::{InMemoryCache, NullCache};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gateway(store: Arc<dyn Cache>) -> CacheGateway {
        CacheGateway::new(Arc::new(CacheStoreManager::new(store)))
    }

    fn tags(names: &[&str]) -> TagSet {
        names.iter().copied().collect()
    }

    async fn counted(
        gateway: &CacheGateway,
        tags: &TagSet,
        calls: &AtomicUsize,
        value: &str,
    ) -> Result<String, DomainError> {
        gateway
            .read_through(None, "key", tags, Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value.to_string())
            })
            .await
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let gateway = gateway(Arc::new(InMemoryCache::new()));
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        assert_eq!(counted(&gateway, &tags, &calls, "a").await.unwrap(), "a");
        assert_eq!(counted(&gateway, &tags, &calls, "b").await.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let gateway = gateway(Arc::new(InMemoryCache::new()));
        let tags = tags(&["products", "categories"]);
        let calls = AtomicUsize::new(0);

        counted(&gateway, &tags, &calls, "a").await.unwrap();
        assert!(gateway.invalidate(&self::tags(&["categories"])).await);

        assert_eq!(counted(&gateway, &tags, &calls, "b").await.unwrap(), "b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unrelated_invalidation_keeps_entry() {
        let gateway = gateway(Arc::new(InMemoryCache::new()));
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        counted(&gateway, &tags, &calls, "a").await.unwrap();
        assert!(gateway.invalidate(&self::tags(&["users"])).await);

        assert_eq!(counted(&gateway, &tags, &calls, "b").await.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_plain_store_invalidation_flushes_everything() {
        let cache = Arc::new(MockCache::new());
        let gateway = gateway(cache.clone());
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        counted(&gateway, &tags, &calls, "a").await.unwrap();
        assert_eq!(cache.keys(), vec!["key".to_string()]);

        assert!(gateway.invalidate(&self::tags(&["users"])).await);
        assert_eq!(cache.clears(), 1);
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_degrades_to_compute() {
        let gateway = gateway(Arc::new(MockCache::new().with_error("down")));
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        assert_eq!(counted(&gateway, &tags, &calls, "a").await.unwrap(), "a");
        assert_eq!(counted(&gateway, &tags, &calls, "b").await.unwrap(), "b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_write_failure_returns_value() {
        let gateway = gateway(Arc::new(MockCache::new().with_write_error("read-only")));
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        assert_eq!(counted(&gateway, &tags, &calls, "a").await.unwrap(), "a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_overwritten() {
        let cache = Arc::new(MockCache::new().with_entry("key", "{not json"));
        let gateway = gateway(cache.clone());
        let calls = AtomicUsize::new(0);

        assert_eq!(
            counted(&gateway, &TagSet::new(), &calls, "fresh").await.unwrap(),
            "fresh"
        );
        assert_eq!(
            cache.get_raw("key").await.unwrap(),
            Some("\"fresh\"".to_string())
        );
    }

    #[tokio::test]
    async fn test_compute_error_propagates_and_is_not_cached() {
        let cache = Arc::new(MockCache::new());
        let gateway = gateway(cache.clone());
        let tags = tags(&["products"]);

        let result: Result<String, _> = gateway
            .read_through(None, "key", &tags, Duration::from_secs(60), || async {
                Err(DomainError::storage("connection lost"))
            })
            .await;

        assert!(matches!(result, Err(DomainError::Storage { .. })));
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_none_results_are_cached() {
        let gateway = gateway(Arc::new(InMemoryCache::new()));
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let found: Option<String> = gateway
                .read_through(None, "key", &tags, Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert!(found.is_none());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidation_failure_returns_false() {
        let gateway = gateway(Arc::new(MockCache::new().with_tags().with_error("down")));
        assert!(!gateway.invalidate(&tags(&["products"])).await);
        assert!(!gateway.invalidate_all().await);
    }

    #[tokio::test]
    async fn test_null_store_always_computes() {
        let gateway = gateway(Arc::new(NullCache::new()));
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        counted(&gateway, &tags, &calls, "a").await.unwrap();
        counted(&gateway, &tags, &calls, "a").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(gateway.invalidate(&tags).await);
    }

    #[tokio::test]
    async fn test_capability_follows_store_swap() {
        let manager = Arc::new(CacheStoreManager::new(Arc::new(InMemoryCache::new())));
        let gateway = CacheGateway::new(manager.clone());
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        counted(&gateway, &tags, &calls, "a").await.unwrap();

        let plain = Arc::new(MockCache::new());
        manager.set_store(plain.clone());

        counted(&gateway, &tags, &calls, "b").await.unwrap();
        assert_eq!(plain.keys(), vec!["key".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_flushes_every_store() {
        let default = Arc::new(InMemoryCache::new());
        let shared = Arc::new(MockCache::new());
        let manager = CacheStoreManager::new(default.clone()).with_store("shared", shared.clone());
        let gateway = CacheGateway::new(Arc::new(manager));

        default
            .set_raw("a", "1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(gateway.invalidate_all().await);
        assert!(default.get_raw("a").await.unwrap().is_none());
        assert_eq!(shared.clears(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_reaches_every_store() {
        let manager = CacheStoreManager::new(Arc::new(InMemoryCache::new()))
            .with_store("shared", Arc::new(InMemoryCache::new()));
        let gateway = CacheGateway::new(Arc::new(manager));
        let tags = tags(&["products", "reviews"]);
        let calls = AtomicUsize::new(0);

        for (value, expected) in [("a", "a"), ("b", "a")] {
            let found: String = gateway
                .read_through(Some("shared"), "key", &tags, Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(value.to_string())
                })
                .await
                .unwrap();
            assert_eq!(found, expected);
        }

        assert!(gateway.invalidate(&self::tags(&["reviews"])).await);

        let found: String = gateway
            .read_through(Some("shared"), "key", &tags, Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("c".to_string())
            })
            .await
            .unwrap();
        assert_eq!(found, "c");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_reports_any_failing_store() {
        let manager = CacheStoreManager::new(Arc::new(InMemoryCache::new()))
            .with_store("broken", Arc::new(MockCache::new().with_tags().with_error("down")));
        let gateway = CacheGateway::new(Arc::new(manager));

        assert!(!gateway.invalidate(&tags(&["products"])).await);
    }

    #[tokio::test]
    async fn test_flush_during_compute_discards_result() {
        let gateway = gateway(Arc::new(InMemoryCache::new()));
        let tags = tags(&["products"]);

        let first: String = gateway
            .read_through(None, "key", &tags, Duration::from_secs(60), || async {
                // A write lands while the query is still running
                assert!(gateway.invalidate(&tags).await);
                Ok("old".to_string())
            })
            .await
            .unwrap();
        assert_eq!(first, "old");

        let second: String = gateway
            .read_through(None, "key", &tags, Duration::from_secs(60), || async {
                Ok("new".to_string())
            })
            .await
            .unwrap();
        assert_eq!(second, "new");
    }

    #[tokio::test]
    async fn test_zero_ttl_skips_the_store() {
        let cache = Arc::new(MockCache::new());
        let gateway = gateway(cache.clone());
        let tags = tags(&["products"]);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: String = gateway
                .read_through(None, "key", &tags, Duration::ZERO, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("a".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "a");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.keys().is_empty());
    }
}
