//! Model domain - Persistent entity types, their relations and the query surface
//! consumed by the cache layer

mod descriptor;
mod eager;
mod entity;
mod events;
mod query;
mod registry;

pub use descriptor::{ModelDescriptor, RelationDefinition, RelationKind};
pub use eager::{EagerLoads, RelationConstraint};
pub use entity::Model;
pub use events::{LifecycleEvent, ModelEvents, ModelObserver};
pub use query::{Page, QueryBuilder, SimplePage};
pub use registry::ModelRegistry;
