//! Process-local store built on moka

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use tracing::warn;
use uuid::Uuid;

use crate::domain::cache::{Cache, TagSet, TaggableCache};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Entries beyond this count are evicted
    pub max_capacity: u64,
    /// Caps the TTL of every entry
    pub max_ttl: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            max_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    payload: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with
struct WrittenTtl;

impl Expiry<String, StoredValue> for WrittenTtl {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local, tag-capable cache backed by moka.
///
/// Entries expire per their own TTL and are evicted when capacity is
/// reached. Tag versions live outside the evicting map so a version can never
/// silently disappear and resurrect orphaned entries.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: MokaCache<String, StoredValue>,
    max_ttl: Duration,
    versions: Mutex<HashMap<String, String>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(WrittenTtl)
            .build();

        Self {
            entries,
            max_ttl: config.max_ttl,
            versions: Mutex::new(HashMap::new()),
        }
    }

    fn versions(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.versions.lock().unwrap_or_else(|poisoned| {
            warn!("Tag version lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.entries.get(key).await.map(|value| value.payload))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let stored = StoredValue {
            payload: value.to_string(),
            ttl: ttl.min(self.max_ttl),
        };

        self.entries.insert(key.to_string(), stored).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
        self.versions().clear();
        Ok(())
    }

    fn as_taggable(&self) -> Option<&dyn TaggableCache> {
        Some(self)
    }
}

#[async_trait]
impl TaggableCache for InMemoryCache {
    async fn tag_version(&self, tag: &str) -> Result<String, DomainError> {
        let mut versions = self.versions();
        let version = versions
            .entry(tag.to_string())
            .or_insert_with(|| Uuid::new_v4().to_string());

        Ok(version.clone())
    }

    async fn flush_tags(&self, tags: &TagSet) -> Result<(), DomainError> {
        let mut versions = self.versions();

        for tag in tags.iter() {
            versions.insert(tag.to_string(), Uuid::new_v4().to_string());
        }

        Ok(())
    }
}
