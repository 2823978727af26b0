//! Entity trait

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Trait for persisted records that can flow through the cache.
///
/// Records are serialized to JSON when stored in the cache backend, so every
/// model must round-trip through serde.
pub trait Model: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Returns the record's primary key
    fn key(&self) -> Value;
}
