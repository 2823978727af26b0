//! Lifecycle observers

mod invalidation;

pub use invalidation::CacheInvalidationObserver;
