//! Infrastructure services

mod cache_gateway;
mod model_caching;

pub use cache_gateway::CacheGateway;
pub use model_caching::{CachingConfig, DisabledScope, ModelCaching};
