//! Active and named cache stores

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::config::CacheSettings;
use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::factory::{CacheConfig, CacheFactory};

/// Holds the default store and any named stores.
///
/// The default store can be swapped at runtime, so callers must resolve the
/// store (and its capabilities) on every operation instead of keeping it.
pub struct CacheStoreManager {
    default: RwLock<Arc<dyn Cache>>,
    named: RwLock<HashMap<String, Arc<dyn Cache>>>,
}

impl fmt::Debug for CacheStoreManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let named: Vec<String> = self
            .named
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();

        f.debug_struct("CacheStoreManager")
            .field("default", &self.current())
            .field("named", &named)
            .finish()
    }
}

impl CacheStoreManager {
    pub fn new(default: Arc<dyn Cache>) -> Self {
        Self {
            default: RwLock::new(default),
            named: RwLock::new(HashMap::new()),
        }
    }

    /// Builds the default store and every named store from settings
    pub async fn from_settings(settings: &CacheSettings) -> Result<Self, DomainError> {
        let factory = CacheFactory::new();
        let mut named = HashMap::new();

        for (name, store) in &settings.stores {
            let config = CacheConfig::from_store_settings(store, settings)?;
            named.insert(name.clone(), factory.create(&config).await?);
        }

        // A default that names a configured store shares its instance
        let default = match named.get(&settings.store) {
            Some(store) => Arc::clone(store),
            None => factory.create(&CacheConfig::from_settings(settings)?).await?,
        };

        let manager = Self {
            default: RwLock::new(default),
            named: RwLock::new(named),
        };

        info!(store = %settings.store, named = settings.stores.len(), "Cache stores initialized");
        Ok(manager)
    }

    pub fn with_store(self, name: impl Into<String>, store: Arc<dyn Cache>) -> Self {
        self.register(name, store);
        self
    }

    /// Adds or replaces a named store
    pub fn register(&self, name: impl Into<String>, store: Arc<dyn Cache>) {
        self.named
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.into(), store);
    }

    /// Replaces the default store
    pub fn set_store(&self, store: Arc<dyn Cache>) {
        *self
            .default
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = store;
    }

    pub fn current(&self) -> Arc<dyn Cache> {
        self.default
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Named store, or the default one when no name is given.
    ///
    /// An unknown name falls back to the default store.
    pub fn store_for(&self, name: Option<&str>) -> Arc<dyn Cache> {
        let Some(name) = name else {
            return self.current();
        };

        let named = self
            .named
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned();

        match named {
            Some(store) => store,
            None => {
                warn!(store = %name, "Unknown cache store, using default");
                self.current()
            }
        }
    }

    /// Every distinct store, default first
    pub fn all(&self) -> Vec<Arc<dyn Cache>> {
        let mut stores = vec![self.current()];

        for store in self
            .named
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
        {
            if !stores.iter().any(|s| Arc::ptr_eq(s, store)) {
                stores.push(store.clone());
            }
        }

        stores
    }
}
