//! Store construction from configuration

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::config::{CacheSettings, StoreSettings};
use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::null::NullCache;
use super::redis::{RedisCache, RedisCacheConfig};

/// Backend a store is built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheType {
    #[default]
    InMemory,
    Redis,
    /// Retains nothing
    Null,
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheType::InMemory => "in_memory",
            CacheType::Redis => "redis",
            CacheType::Null => "null",
        };
        f.write_str(name)
    }
}

impl FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" | "array" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            "null" | "none" => Ok(CacheType::Null),
            other => Err(DomainError::configuration(format!(
                "Unknown cache driver '{}' (expected in_memory, redis or null)",
                other
            ))),
        }
    }
}

/// Everything needed to build one store
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_type: CacheType,
    /// Mandatory for Redis
    pub redis_url: Option<String>,
    /// Namespaces Redis keys; ignored by the other drivers
    pub key_prefix: Option<String>,
    /// Entry bound for the in-memory driver
    pub max_capacity: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            redis_url: None,
            key_prefix: None,
            max_capacity: None,
        }
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn null() -> Self {
        Self {
            cache_type: CacheType::Null,
            ..Self::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Resolves the default store.
    ///
    /// `settings.store` names either an entry of `settings.stores` or a driver.
    pub fn from_settings(settings: &CacheSettings) -> Result<Self, DomainError> {
        if let Some(store) = settings.stores.get(&settings.store) {
            return Self::from_store_settings(store, settings);
        }

        Ok(Self {
            cache_type: settings.store.parse()?,
            redis_url: settings.redis_url.clone(),
            key_prefix: Some(settings.prefix.clone()),
            max_capacity: Some(settings.max_capacity),
        })
    }

    /// Resolves a named store; unset fields inherit the global settings
    pub fn from_store_settings(
        store: &StoreSettings,
        settings: &CacheSettings,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            cache_type: store.driver.parse()?,
            redis_url: store.redis_url.clone().or_else(|| settings.redis_url.clone()),
            key_prefix: Some(settings.prefix.clone()),
            max_capacity: Some(store.max_capacity.unwrap_or(settings.max_capacity)),
        })
    }
}

/// Builds stores by driver
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Builds a store; Redis stores connect before returning
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        let store: Arc<dyn Cache> = match config.cache_type {
            CacheType::InMemory => {
                let memory = match config.max_capacity {
                    Some(capacity) => InMemoryCacheConfig::default().with_max_capacity(capacity),
                    None => InMemoryCacheConfig::default(),
                };
                Arc::new(InMemoryCache::with_config(memory))
            }
            CacheType::Redis => {
                let url = config.redis_url.as_deref().ok_or_else(|| {
                    DomainError::configuration("The redis driver needs a redis_url")
                })?;

                let redis = match &config.key_prefix {
                    Some(prefix) => RedisCacheConfig::new(url).with_key_prefix(prefix.as_str()),
                    None => RedisCacheConfig::new(url),
                };
                Arc::new(RedisCache::new(redis).await?)
            }
            CacheType::Null => Arc::new(NullCache::new()),
        };

        info!(driver = %config.cache_type, "Cache store created");
        Ok(store)
    }
}
