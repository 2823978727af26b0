//! Cache metrics
//!
//! Counters are recorded through the `metrics` facade and are no-ops until the
//! host process installs a recorder.

use metrics::counter;

/// Record a read served from the cache
pub fn record_cache_hit(backend: &'static str) {
    counter!("model_cache_hits_total", "backend" => backend).increment(1);
}

/// Record a read that had to run the real query
pub fn record_cache_miss(backend: &'static str) {
    counter!("model_cache_misses_total", "backend" => backend).increment(1);
}

/// Record a backend failure that was degraded instead of raised
pub fn record_cache_error(stage: &'static str) {
    counter!("model_cache_errors_total", "stage" => stage).increment(1);
}

/// Record an invalidation attempt
pub fn record_invalidation(scope: &'static str, success: bool) {
    let labels = [
        ("scope", scope.to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("model_cache_invalidations_total", &labels).increment(1);
}
