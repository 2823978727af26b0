//! Domain layer - Core caching logic and the entity model it operates on

pub mod cache;
pub mod error;
pub mod model;

pub use cache::{
    CachePolicy, Cache, CallKind, KeyNamespace, QueryFingerprint, QueryKeyGenerator,
    TagResolver, TagSet, TaggableCache, TaggedCache,
};
pub use error::DomainError;
pub use model::{
    EagerLoads, LifecycleEvent, Model, ModelDescriptor, ModelEvents, ModelObserver,
    ModelRegistry, Page, QueryBuilder, RelationConstraint, RelationDefinition, RelationKind,
    SimplePage,
};
