//! Cache infrastructure - Store implementations and selection

mod factory;
mod in_memory;
mod manager;
mod null;
mod redis;

pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use manager::CacheStoreManager;
pub use null::NullCache;
pub use redis::{RedisCache, RedisCacheConfig};
