//! Per-query caching policy

use std::time::Duration;

use crate::domain::model::ModelDescriptor;

/// Caching options carried by a single query builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub caching_enabled: bool,
    /// Set by an explicit disable; never cleared for the same query
    pub bypassed: bool,
    pub ttl_override: Option<u64>,
    pub cooldown_seconds: Option<u64>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            caching_enabled: true,
            bypassed: false,
            ttl_override: None,
            cooldown_seconds: None,
        }
    }
}

impl CachePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disable(&mut self) {
        self.caching_enabled = false;
        self.bypassed = true;
    }

    pub fn enable(&mut self) {
        self.caching_enabled = true;
    }

    /// Whether this query may use the cache, given the global switch
    pub fn should_cache(&self, globally_enabled: bool) -> bool {
        globally_enabled && self.caching_enabled && !self.bypassed
    }

    /// Per-query override, then the model default, then the global default
    pub fn resolve_ttl(&self, model: &ModelDescriptor, default_ttl: u64) -> Duration {
        let seconds = self
            .ttl_override
            .or(model.cache_ttl)
            .unwrap_or(default_ttl);

        Duration::from_secs(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_caches() {
        let policy = CachePolicy::new();
        assert!(policy.should_cache(true));
        assert!(!policy.should_cache(false));
    }

    #[test]
    fn test_enable_does_not_undo_bypass() {
        let mut policy = CachePolicy::new();
        policy.disable();
        policy.enable();

        assert!(policy.caching_enabled);
        assert!(policy.bypassed);
        assert!(!policy.should_cache(true));
    }

    #[test]
    fn test_ttl_resolution_order() {
        let plain = ModelDescriptor::new("Product", "products");
        let with_ttl = ModelDescriptor::new("Product", "products").with_cache_ttl(120);

        let mut policy = CachePolicy::new();
        assert_eq!(policy.resolve_ttl(&plain, 3600), Duration::from_secs(3600));
        assert_eq!(policy.resolve_ttl(&with_ttl, 3600), Duration::from_secs(120));

        policy.ttl_override = Some(5);
        assert_eq!(policy.resolve_ttl(&with_ttl, 3600), Duration::from_secs(5));
    }
}
