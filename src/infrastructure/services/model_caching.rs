//! Caching facade: global switch, administrative clears and query wrapping

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AppConfig, CacheSettings};
use crate::domain::cache::{KeyNamespace, QueryKeyGenerator, TagResolver};
use crate::domain::model::{EagerLoads, Model, ModelDescriptor, ModelRegistry, QueryBuilder};
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheStoreManager;
use crate::infrastructure::observers::CacheInvalidationObserver;
use crate::infrastructure::query::CachingQuery;

use super::cache_gateway::CacheGateway;

/// Global caching configuration.
///
/// Everything is fixed at boot except the enabled flag, which only changes
/// through [`DisabledScope`].
#[derive(Debug)]
pub struct CachingConfig {
    enabled: AtomicBool,
    settings: CacheSettings,
}

impl CachingConfig {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            enabled: AtomicBool::new(settings.enabled),
            settings,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn default_ttl(&self) -> u64 {
        self.settings.ttl
    }

    /// Turns caching off until the returned guard is dropped.
    ///
    /// Guards must be dropped in reverse order of creation.
    pub fn disable_scoped(&self) -> DisabledScope<'_> {
        let previous = self.enabled.swap(false, Ordering::SeqCst);
        DisabledScope {
            config: self,
            previous,
        }
    }
}

/// Restores the enabled flag to its prior value on drop, including during unwinding
#[derive(Debug)]
#[must_use = "caching is re-enabled as soon as the scope is dropped"]
pub struct DisabledScope<'a> {
    config: &'a CachingConfig,
    previous: bool,
}

impl Drop for DisabledScope<'_> {
    fn drop(&mut self) {
        self.config.enabled.store(self.previous, Ordering::SeqCst);
    }
}

/// Entry point of the caching layer
#[derive(Debug)]
pub struct ModelCaching {
    config: CachingConfig,
    gateway: CacheGateway,
    keys: QueryKeyGenerator,
    tags: TagResolver,
    registry: Arc<ModelRegistry>,
}

impl ModelCaching {
    pub fn new(
        settings: CacheSettings,
        registry: ModelRegistry,
        stores: Arc<CacheStoreManager>,
    ) -> Self {
        let namespace = KeyNamespace::new(settings.prefix.clone(), settings.use_database_keying);
        let registry = Arc::new(registry);

        Self {
            config: CachingConfig::new(settings),
            gateway: CacheGateway::new(stores),
            keys: QueryKeyGenerator::new(namespace.clone()),
            tags: TagResolver::new(registry.clone(), namespace),
            registry,
        }
    }

    /// Builds the stores and model catalogue from application configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self, DomainError> {
        let stores = CacheStoreManager::from_settings(&config.cache).await?;
        let registry = ModelRegistry::from_descriptors(config.models.iter().cloned());

        Ok(Self::new(config.cache.clone(), registry, Arc::new(stores)))
    }

    pub fn config(&self) -> &CachingConfig {
        &self.config
    }

    pub fn gateway(&self) -> &CacheGateway {
        &self.gateway
    }

    pub fn key_generator(&self) -> &QueryKeyGenerator {
        &self.keys
    }

    pub fn tag_resolver(&self) -> &TagResolver {
        &self.tags
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Runs `f` with caching disabled, restoring the previous state afterwards.
    ///
    /// The flag is shared by every task using this facade, so concurrent
    /// scopes must strictly nest. If task A enters, then task B enters, then A
    /// leaves before B, caching turns back on while B is still inside and
    /// stays off once B restores the `false` it saw on entry.
    pub async fn run_disabled<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _scope = self.config.disable_scoped();
        f().await
    }

    /// Wraps a query builder so its reads go through the cache
    pub fn query<M, Q>(self: &Arc<Self>, query: Q) -> CachingQuery<M, Q>
    where
        M: Model,
        Q: QueryBuilder<M>,
    {
        CachingQuery::new(Arc::clone(self), query)
    }

    /// Lifecycle observer that invalidates a model's tags on every write
    pub fn observer(self: &Arc<Self>) -> Arc<CacheInvalidationObserver> {
        Arc::new(CacheInvalidationObserver::new(Arc::clone(self)))
    }

    /// Flushes the tags of one entity type's own table in every store.
    ///
    /// Entries that eager-load this type may live in another model's store.
    pub async fn invalidate_model(&self, model: &ModelDescriptor) -> bool {
        let tags = self.tags.make_tags(model, &EagerLoads::new());
        self.gateway.invalidate(&tags).await
    }

    /// Clears cached results of a registered entity type; unknown names yield `false`
    pub async fn clear_model(&self, name: &str) -> bool {
        let Some(model) = self.registry.get(name) else {
            warn!(model = %name, "Cannot clear cache of unregistered model");
            return false;
        };

        let cleared = self.invalidate_model(&model).await;
        info!(model = %name, cleared, "Model cache cleared");
        cleared
    }

    /// Flushes every store
    pub async fn clear_all(&self) -> bool {
        self.gateway.invalidate_all().await
    }
}
