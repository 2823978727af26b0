//! Model descriptors - static identity of an entity type

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const DEFAULT_CONNECTION: &str = "default";
const DEFAULT_DATABASE: &str = "default";
const DEFAULT_PER_PAGE: u32 = 15;

/// Kind of relationship between two entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    #[default]
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

/// A named relationship pointing at another registered entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// Name of the related entity type in the model registry
    pub related: String,
    #[serde(default)]
    pub kind: RelationKind,
}

impl RelationDefinition {
    pub fn new(related: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            related: related.into(),
            kind,
        }
    }
}

/// Describes a persistent entity type: where it lives and how it relates to others.
///
/// Cache-related fields (`cache_prefix`, `cache_ttl`, `cache_cooldown_seconds`,
/// `cache_store`) override the global configuration for this type only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Entity type identity (e.g. "Product")
    pub name: String,
    /// Backing table / collection
    pub table: String,
    #[serde(default = "default_connection")]
    pub connection: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default)]
    pub cache_prefix: Option<String>,
    #[serde(default)]
    pub cache_ttl: Option<u64>,
    #[serde(default)]
    pub cache_cooldown_seconds: Option<u64>,
    #[serde(default)]
    pub cache_store: Option<String>,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub relations: BTreeMap<String, RelationDefinition>,
}

fn default_connection() -> String {
    DEFAULT_CONNECTION.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl ModelDescriptor {
    /// Creates a descriptor on the default connection
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            connection: default_connection(),
            database: default_database(),
            cache_prefix: None,
            cache_ttl: None,
            cache_cooldown_seconds: None,
            cache_store: None,
            per_page: DEFAULT_PER_PAGE,
            relations: BTreeMap::new(),
        }
    }

    /// Sets the connection and database names
    pub fn on_connection(mut self, connection: impl Into<String>, database: impl Into<String>) -> Self {
        self.connection = connection.into();
        self.database = database.into();
        self
    }

    /// Sets a cache key prefix that takes precedence over the configured one
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = Some(prefix.into());
        self
    }

    /// Sets the model-level TTL in seconds
    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.cache_ttl = Some(seconds);
        self
    }

    /// Sets the model-level cooldown default
    pub fn with_cache_cooldown(mut self, seconds: u64) -> Self {
        self.cache_cooldown_seconds = Some(seconds);
        self
    }

    /// Routes this model's entries to a named store
    pub fn with_cache_store(mut self, store: impl Into<String>) -> Self {
        self.cache_store = Some(store.into());
        self
    }

    /// Sets the default page size
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Adds a relation of the given kind
    pub fn with_relation(
        mut self,
        name: impl Into<String>,
        related: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        self.relations
            .insert(name.into(), RelationDefinition::new(related, kind));
        self
    }

    pub fn belongs_to(self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.with_relation(name, related, RelationKind::BelongsTo)
    }

    pub fn has_many(self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.with_relation(name, related, RelationKind::HasMany)
    }

    /// Looks up a relation by name
    pub fn relation(&self, name: &str) -> Option<&RelationDefinition> {
        self.relations.get(name)
    }
}
