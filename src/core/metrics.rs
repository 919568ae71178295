// src/core/metrics.rs

//! Defines and registers Prometheus metrics for router monitoring.
//!
//! This module uses `lazy_static` to ensure that metrics are registered only once
//! globally for the entire application lifecycle, no matter how many routers exist.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, TextEncoder, register_counter, register_counter_vec,
    register_gauge,
};

lazy_static! {
    // --- Cache Counters ---
    /// Lookups answered from the cache, labeled by whether the shared-lock check
    /// (`fast`) or the exclusive-lock re-check (`recheck`) found the entry.
    pub static ref CACHE_HITS_TOTAL: CounterVec =
        register_counter_vec!("ringroute_cache_hits_total", "Total number of client cache hits, labeled by lock path.", &["path"]).unwrap();
    /// Lookups that had to construct a new client.
    pub static ref CACHE_MISSES_TOTAL: Counter =
        register_counter!("ringroute_cache_misses_total", "Total number of client cache misses.").unwrap();
    /// Client handles built, labeled `local` or `remote`.
    pub static ref CLIENTS_CREATED_TOTAL: CounterVec =
        register_counter_vec!("ringroute_clients_created_total", "Total number of client handles constructed, labeled by kind.", &["kind"]).unwrap();
    /// Cached clients dropped because membership reported their node unreachable.
    pub static ref EVICTIONS_TOTAL: Counter =
        register_counter!("ringroute_evictions_total", "Total number of cached clients evicted after membership changes.").unwrap();


    // --- Error Counters ---
    /// Failed routing calls, labeled by the stage that failed.
    pub static ref ROUTE_ERRORS_TOTAL: CounterVec =
        register_counter_vec!("ringroute_route_errors_total", "Total number of failed routing calls, labeled by stage.", &["stage"]).unwrap();


    // --- Gauges ---
    /// Number of client handles currently cached, summed across routers.
    pub static ref CACHED_CLIENTS: Gauge =
        register_gauge!("ringroute_cached_clients", "Number of client handles currently cached.").unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
