//! Cache that retains nothing

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Store that accepts every write and never returns a hit
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Cache for NullCache {
    async fn get_raw(&self, _key: &str) -> Result<Option<String>, DomainError> {
        Ok(None)
    }

    async fn set_raw(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), DomainError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
