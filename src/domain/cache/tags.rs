//! Tag derivation for cached query results

use std::sync::Arc;

use tracing::debug;

use crate::domain::model::{EagerLoads, ModelDescriptor, ModelRegistry};

use super::key::KeyNamespace;

/// Ordered, deduplicated set of invalidation tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a tag unless it is already present
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.0.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

/// Maps an entity type and its eager loads to the tags of every table read
#[derive(Debug, Clone)]
pub struct TagResolver {
    registry: Arc<ModelRegistry>,
    namespace: KeyNamespace,
}

impl TagResolver {
    pub fn new(registry: Arc<ModelRegistry>, namespace: KeyNamespace) -> Self {
        Self {
            registry,
            namespace,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Tag for a single entity type's table
    pub fn tag_for(&self, model: &ModelDescriptor) -> String {
        format!("{}:{}", self.namespace.for_model(model), model.table)
    }

    /// Root tag first, then one tag per resolvable eager-load path
    pub fn make_tags(&self, model: &ModelDescriptor, eager_loads: &EagerLoads) -> TagSet {
        let mut tags = TagSet::new();
        tags.insert(self.tag_for(model));

        for path in eager_loads.paths() {
            if let Some(related) = self.resolve_path(model, path) {
                tags.insert(self.tag_for(&related));
            }
        }

        tags
    }

    fn resolve_path(&self, model: &ModelDescriptor, path: &str) -> Option<Arc<ModelDescriptor>> {
        let mut segments = path.split('.');
        let first = segments.next()?;

        let mut current = match self.registry.related(model, first) {
            Ok(related) => related,
            Err(e) => {
                debug!(model = %model.name, path = %path, error = %e, "Skipping eager load path");
                return None;
            }
        };

        for segment in segments {
            current = match self.registry.related(&current, segment) {
                Ok(related) => related,
                Err(e) => {
                    debug!(model = %model.name, path = %path, error = %e, "Skipping eager load path");
                    return None;
                }
            };
        }

        Some(current)
    }
}
