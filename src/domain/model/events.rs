//! Entity lifecycle events and observers

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use super::descriptor::ModelDescriptor;

/// Write events an observer can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Created,
    Updated,
    Deleted,
    Restored,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Created => write!(f, "created"),
            LifecycleEvent::Updated => write!(f, "updated"),
            LifecycleEvent::Deleted => write!(f, "deleted"),
            LifecycleEvent::Restored => write!(f, "restored"),
        }
    }
}

/// Receives lifecycle notifications for written entities.
///
/// Callbacks run synchronously inside the write and cannot fail it.
#[async_trait]
pub trait ModelObserver: Send + Sync {
    async fn created(&self, _model: &ModelDescriptor, _key: &Value) {}

    async fn updated(&self, _model: &ModelDescriptor, _key: &Value) {}

    async fn deleted(&self, _model: &ModelDescriptor, _key: &Value) {}

    async fn restored(&self, _model: &ModelDescriptor, _key: &Value) {}
}

/// Registry of lifecycle observers shared by the data layer
#[derive(Default)]
pub struct ModelEvents {
    observers: RwLock<Vec<Arc<dyn ModelObserver>>>,
}

impl fmt::Debug for ModelEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEvents")
            .field("observers", &self.len())
            .finish()
    }
}

impl ModelEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for every subsequent write
    pub fn observe(&self, observer: Arc<dyn ModelObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notifies every observer of a write, in registration order
    pub async fn dispatch(&self, event: LifecycleEvent, model: &ModelDescriptor, key: &Value) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for observer in observers {
            match event {
                LifecycleEvent::Created => observer.created(model, key).await,
                LifecycleEvent::Updated => observer.updated(model, key).await,
                LifecycleEvent::Deleted => observer.deleted(model, key).await,
                LifecycleEvent::Restored => observer.restored(model, key).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<(LifecycleEvent, String)>>,
    }

    #[async_trait]
    impl ModelObserver for RecordingObserver {
        async fn created(&self, model: &ModelDescriptor, _key: &Value) {
            self.seen
                .lock()
                .unwrap()
                .push((LifecycleEvent::Created, model.name.clone()));
        }

        async fn deleted(&self, model: &ModelDescriptor, _key: &Value) {
            self.seen
                .lock()
                .unwrap()
                .push((LifecycleEvent::Deleted, model.name.clone()));
        }
    }

    #[tokio::test]
    async fn test_dispatch_reaches_observers() {
        let events = ModelEvents::new();
        let observer = Arc::new(RecordingObserver::default());
        events.observe(observer.clone());

        let model = ModelDescriptor::new("Product", "products");
        events
            .dispatch(LifecycleEvent::Created, &model, &Value::from(1))
            .await;
        events
            .dispatch(LifecycleEvent::Updated, &model, &Value::from(1))
            .await;
        events
            .dispatch(LifecycleEvent::Deleted, &model, &Value::from(1))
            .await;

        let seen = observer.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (LifecycleEvent::Created, "Product".to_string()),
                (LifecycleEvent::Deleted, "Product".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_observers_is_noop() {
        let events = ModelEvents::new();
        assert!(events.is_empty());

        let model = ModelDescriptor::new("Product", "products");
        events
            .dispatch(LifecycleEvent::Restored, &model, &Value::Null)
            .await;
    }

    #[test]
    fn test_lifecycle_event_display() {
        assert_eq!(LifecycleEvent::Created.to_string(), "created");
        assert_eq!(LifecycleEvent::Restored.to_string(), "restored");
    }
}
