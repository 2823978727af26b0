//! Shared store on Redis

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::debug;
use uuid::Uuid;

use crate::domain::cache::{Cache, TagSet, TaggableCache};
use crate::domain::DomainError;

/// Connection settings for [`RedisCache`]
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    pub url: String,
    /// Key prefix for namespacing; without one `clear` flushes the whole database
    pub key_prefix: Option<String>,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }
}

/// Shared, tag-capable cache backed by Redis
///
/// Tag versions are plain keys without expiry; flushing a tag overwrites its
/// version and leaves the orphaned entries to expire on their own TTL.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Opens a managed connection; the manager reconnects on its own afterwards
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Invalid Redis URL '{}': {}", config.url, e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::cache(format!("Redis unreachable at '{}': {}", config.url, e)))?;

        Ok(Self { connection, config })
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn version_key(&self, tag: &str) -> String {
        self.prefix_key(&format!("tag:{}:version", tag))
    }

    /// Deletes every key under the prefix, one SCAN batch at a time
    async fn delete_prefixed(&self) -> Result<usize, DomainError> {
        let pattern = self.prefix_key("*");
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut removed = 0usize;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| redis_error("SCAN", &pattern, e))?;

            if !keys.is_empty() {
                let count: usize = conn
                    .del(&keys)
                    .await
                    .map_err(|e| redis_error("DEL", &pattern, e))?;
                removed += count;
            }

            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }
}

const SCAN_BATCH: usize = 500;

fn redis_error(command: &str, target: &str, error: redis::RedisError) -> DomainError {
    DomainError::cache(format!("Redis {} on '{}' failed: {}", command, target, error))
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.connection.clone();
        conn.get(self.prefix_key(key))
            .await
            .map_err(|e| redis_error("GET", key, e))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();
        // SETEX takes whole seconds; sub-second TTLs round up to one
        let seconds = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(self.prefix_key(key), value, seconds)
            .await
            .map_err(|e| redis_error("SETEX", key, e))?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        if self.config.key_prefix.is_some() {
            let removed = self.delete_prefixed().await?;
            debug!(removed = removed, "Redis prefix cleared");
            return Ok(());
        }

        let mut conn = self.connection.clone();
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| redis_error("FLUSHDB", "*", e))
    }

    fn as_taggable(&self) -> Option<&dyn TaggableCache> {
        Some(self)
    }
}

#[async_trait]
impl TaggableCache for RedisCache {
    async fn tag_version(&self, tag: &str) -> Result<String, DomainError> {
        let version_key = self.version_key(tag);
        let mut conn = self.connection.clone();

        // Concurrent first readers race on SET NX; every one of them reads back the winner
        let _: Option<String> = redis::cmd("SET")
            .arg(&version_key)
            .arg(Uuid::new_v4().to_string())
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_error("SET NX", &version_key, e))?;

        let version: Option<String> = conn
            .get(&version_key)
            .await
            .map_err(|e| redis_error("GET", &version_key, e))?;

        version.ok_or_else(|| DomainError::cache(format!("Tag version '{}' vanished", tag)))
    }

    async fn flush_tags(&self, tags: &TagSet) -> Result<(), DomainError> {
        if tags.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();

        for tag in tags.iter() {
            pipe.set(self.version_key(tag), Uuid::new_v4().to_string())
                .ignore();
        }

        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| redis_error("SET", "tag versions", e))
    }
}
