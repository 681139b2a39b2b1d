// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the cache and resilience engines.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host application is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `datasource_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `cache`: the cache name from [`CacheConfig`](crate::CacheConfig)
//! - `operation`: logical datasource operation (getById, getAll, ...)
//! - `kind`: normalized error kind
//! - `outcome`: success, failed, exhausted

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a cache lookup result
pub fn record_cache_lookup(cache: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!(
        "datasource_cache_lookups_total",
        "cache" => cache.to_string(),
        "result" => result
    )
    .increment(1);
}

/// Record entries removed by size-based eviction
pub fn record_evictions(cache: &str, count: usize) {
    counter!("datasource_cache_evictions_total", "cache" => cache.to_string())
        .increment(count as u64);
}

/// Record entries removed because their TTL elapsed
pub fn record_expirations(cache: &str, count: usize) {
    counter!("datasource_cache_expirations_total", "cache" => cache.to_string())
        .increment(count as u64);
}

/// Record entries removed by explicit/pattern invalidation
pub fn record_invalidations(cache: &str, count: usize) {
    counter!("datasource_cache_invalidations_total", "cache" => cache.to_string())
        .increment(count as u64);
}

/// Set current cache entry count
pub fn set_cache_entries(cache: &str, count: usize) {
    gauge!("datasource_cache_entries", "cache" => cache.to_string()).set(count as f64);
}

/// Record a retry being scheduled after a transient failure
pub fn record_retry(operation: &str, kind: &str, delay: Duration) {
    counter!(
        "datasource_retries_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
    histogram!("datasource_retry_delay_seconds", "operation" => operation.to_string())
        .record(delay.as_secs_f64());
}

/// Record the final outcome of a resilient operation
pub fn record_operation_outcome(operation: &str, outcome: &str) {
    counter!(
        "datasource_operations_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a failed item inside a batch
pub fn record_batch_failure(operation: &str, kind: &str) {
    counter!(
        "datasource_batch_failures_total",
        "operation" => operation.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}
