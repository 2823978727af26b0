//! Cache invalidation on entity writes

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::model::{LifecycleEvent, ModelDescriptor, ModelObserver};
use crate::infrastructure::services::ModelCaching;

/// Flushes an entity type's own tag whenever one of its rows is written.
///
/// Entries that eagerly loaded the type carry its tag too, so they are
/// invalidated along with the type's own queries, whichever store holds them.
#[derive(Debug, Clone)]
pub struct CacheInvalidationObserver {
    caching: Arc<ModelCaching>,
}

impl CacheInvalidationObserver {
    pub fn new(caching: Arc<ModelCaching>) -> Self {
        Self { caching }
    }

    async fn invalidate(&self, event: LifecycleEvent, model: &ModelDescriptor, key: &Value) {
        debug!(model = %model.name, key = %key, event = %event, "Invalidating cached queries");
        // Failures are already logged by the gateway and must not fail the write
        let _ = self.caching.invalidate_model(model).await;
    }
}

#[async_trait]
impl ModelObserver for CacheInvalidationObserver {
    async fn created(&self, model: &ModelDescriptor, key: &Value) {
        self.invalidate(LifecycleEvent::Created, model, key).await;
    }

    async fn updated(&self, model: &ModelDescriptor, key: &Value) {
        self.invalidate(LifecycleEvent::Updated, model, key).await;
    }

    async fn deleted(&self, model: &ModelDescriptor, key: &Value) {
        self.invalidate(LifecycleEvent::Deleted, model, key).await;
    }

    async fn restored(&self, model: &ModelDescriptor, key: &Value) {
        self.invalidate(LifecycleEvent::Restored, model, key).await;
    }
}
