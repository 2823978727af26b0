//! Cache backend abstraction

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::tags::TagSet;

/// Key/value store holding serialized query results.
///
/// Values cross the trait as JSON text so the trait stays object-safe.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Stores `value` under `key` for at most `ttl`
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Drops every entry, tag versions included
    async fn clear(&self) -> Result<(), DomainError>;

    /// Tag-capable view of this store; `None` when tags are unsupported
    fn as_taggable(&self) -> Option<&dyn TaggableCache> {
        None
    }
}

/// Backend that can scope entries to tags and flush them by tag.
///
/// Each tag carries an opaque version; entries are stored under a namespace
/// derived from the versions of their tags. Flushing a tag replaces its
/// version, which orphans every entry stored under the old namespace.
#[async_trait]
pub trait TaggableCache: Cache {
    /// Current version of a tag, created on first use
    async fn tag_version(&self, tag: &str) -> Result<String, DomainError>;

    /// Invalidates every entry stored under any of the given tags
    async fn flush_tags(&self, tags: &TagSet) -> Result<(), DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock cache for testing.
    ///
    /// Plain by default; `with_tags` turns on tag support backed by a
    /// version map, and `with_error` makes every call fail.
    #[derive(Debug, Default)]
    pub struct MockCache {
        entries: Mutex<HashMap<String, (String, Option<Duration>)>>,
        versions: Mutex<HashMap<String, u64>>,
        error: Mutex<Option<String>>,
        write_error: Mutex<Option<String>>,
        taggable: bool,
        clears: AtomicUsize,
    }

    impl MockCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_tags(mut self) -> Self {
            self.taggable = true;
            self
        }

        pub fn with_entry(self, key: &str, value: &str) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), None));
            self
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            *self.error.lock().unwrap() = Some(error.into());
            self
        }

        pub fn with_write_error(self, error: impl Into<String>) -> Self {
            *self.write_error.lock().unwrap() = Some(error.into());
            self
        }

        /// Number of full flushes performed
        pub fn clears(&self) -> usize {
            self.clears.load(Ordering::SeqCst)
        }

        pub fn keys(&self) -> Vec<String> {
            self.entries.lock().unwrap().keys().cloned().collect()
        }

        fn check_error(&self) -> Result<(), DomainError> {
            if let Some(error) = self.error.lock().unwrap().clone() {
                return Err(DomainError::cache(error));
            }
            Ok(())
        }

        fn check_write_error(&self) -> Result<(), DomainError> {
            self.check_error()?;
            if let Some(error) = self.write_error.lock().unwrap().clone() {
                return Err(DomainError::cache(error));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Cache for MockCache {
        async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            self.check_error()?;
            let entries = self.entries.lock().unwrap();

            Ok(entries.get(key).map(|(json, _)| json.clone()))
        }

        async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
            self.check_write_error()?;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (value.to_string(), Some(ttl)));
            Ok(())
        }

        async fn clear(&self) -> Result<(), DomainError> {
            self.check_write_error()?;
            self.entries.lock().unwrap().clear();
            self.versions.lock().unwrap().clear();
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn as_taggable(&self) -> Option<&dyn TaggableCache> {
            if self.taggable {
                Some(self)
            } else {
                None
            }
        }
    }

    #[async_trait]
    impl TaggableCache for MockCache {
        async fn tag_version(&self, tag: &str) -> Result<String, DomainError> {
            self.check_error()?;
            let mut versions = self.versions.lock().unwrap();
            let version = versions.entry(tag.to_string()).or_insert(0);
            Ok(version.to_string())
        }

        async fn flush_tags(&self, tags: &TagSet) -> Result<(), DomainError> {
            self.check_write_error()?;
            let mut versions = self.versions.lock().unwrap();
            for tag in tags.iter() {
                *versions.entry(tag.to_string()).or_insert(0) += 1;
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_cache_records_writes() {
            let cache = MockCache::new();
            cache
                .set_raw("row", "{\"id\":7}", Duration::from_secs(60))
                .await
                .unwrap();

            assert_eq!(cache.get_raw("row").await.unwrap().as_deref(), Some("{\"id\":7}"));
            assert_eq!(cache.keys(), vec!["row".to_string()]);
        }

        #[tokio::test]
        async fn test_failing_backend() {
            let cache = MockCache::new().with_error("down");
            let err = cache.get_raw("row").await.unwrap_err();
            assert!(matches!(err, DomainError::Cache { .. }));
        }

        #[tokio::test]
        async fn test_write_error_leaves_reads_working() {
            let cache = MockCache::new().with_entry("row", "1").with_write_error("read-only");

            assert!(cache.set_raw("row", "2", Duration::from_secs(60)).await.is_err());
            assert_eq!(cache.get_raw("row").await.unwrap().as_deref(), Some("1"));
        }

        #[tokio::test]
        async fn test_mock_cache_is_plain_by_default() {
            assert!(MockCache::new().as_taggable().is_none());
            assert!(MockCache::new().with_tags().as_taggable().is_some());
        }

        #[tokio::test]
        async fn test_mock_cache_flush_bumps_version() {
            let cache = MockCache::new().with_tags();
            let before = cache.tag_version("products").await.unwrap();

            let tags: TagSet = ["products"].into_iter().collect();
            cache.flush_tags(&tags).await.unwrap();

            assert_ne!(before, cache.tag_version("products").await.unwrap());
        }

        #[tokio::test]
        async fn test_mock_cache_clear_counts() {
            let cache = MockCache::new().with_entry("a", "1");
            cache.clear().await.unwrap();

            assert!(cache.keys().is_empty());
            assert_eq!(cache.clears(), 1);
        }
    }
}
