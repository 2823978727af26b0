//! Model registry - lookup of entity types by name

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::DomainError;

use super::descriptor::ModelDescriptor;

/// Catalogue of known entity types.
///
/// Relations reference their target by name; the registry turns those names
/// back into descriptors without touching the data store.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<ModelDescriptor>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a list of descriptors
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ModelDescriptor>) -> Self {
        let mut registry = Self::new();

        for descriptor in descriptors {
            registry.register(descriptor);
        }

        registry
    }

    /// Adds a descriptor, replacing any previous one with the same name
    pub fn register(&mut self, descriptor: ModelDescriptor) {
        self.models
            .insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    pub fn with_model(mut self, descriptor: ModelDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<ModelDescriptor>> {
        self.models.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Resolves one relation step from `model` to the related descriptor
    pub fn related(
        &self,
        model: &ModelDescriptor,
        relation: &str,
    ) -> Result<Arc<ModelDescriptor>, DomainError> {
        let definition = model.relation(relation).ok_or_else(|| {
            DomainError::not_found(format!(
                "Relation '{}' is not defined on model '{}'",
                relation, model.name
            ))
        })?;

        self.get(&definition.related).ok_or_else(|| {
            DomainError::not_found(format!(
                "Related model '{}' of relation '{}.{}' is not registered",
                definition.related, model.name, relation
            ))
        })
    }
}
