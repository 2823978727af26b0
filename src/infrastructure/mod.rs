//! Infrastructure layer - Cache stores, the caching services and the in-memory data source

pub mod cache;
pub mod logging;
pub mod memory;
pub mod metrics;
pub mod observers;
pub mod query;
pub mod services;
