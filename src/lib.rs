//! Model Cache
//!
//! A transparent read-through cache for ORM-style queries:
//! - Deterministic cache keys fingerprinted from the rendered query
//! - Tag-based invalidation covering eager-loaded relations
//! - In-memory, Redis and null stores selected by configuration
//! - Lifecycle observers that flush an entity type's tags on every write

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::DomainError;
pub use infrastructure::services::ModelCaching;
