//! Application metrics collection and reporting.
//!
//! Counters are kept both as process-local atomics (for tests and the
//! `/metrics` summary) and as `metrics` series exported to Prometheus.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use storage::CacheStats;

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    query_errors: AtomicU64,
}

/// Metrics collector shared by all handlers.
#[derive(Debug, Clone, Default)]
pub struct MapMetrics {
    counters: Arc<Counters>,
}

impl MapMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register series descriptions with the installed recorder.
    pub fn describe() {
        describe_counter!("map_requests_total", "Requests by endpoint");
        describe_counter!("map_cache_hits_total", "Response cache hits");
        describe_counter!("map_cache_misses_total", "Response cache misses");
        describe_counter!("map_query_errors_total", "Failed spatial queries");
        describe_histogram!("map_query_duration_ms", "Spatial query latency");
        describe_histogram!("map_upstream_duration_ms", "VWorld request latency");
        describe_gauge!("map_cache_entries", "Entries in the response cache");
        describe_gauge!("map_cache_size_bytes", "Bytes held by the response cache");
    }

    pub fn record_request(&self, endpoint: &'static str) {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        counter!("map_requests_total", "endpoint" => endpoint).increment(1);
    }

    pub fn record_cache_hit(&self) {
        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("map_cache_hits_total").increment(1);
    }

    pub fn record_cache_miss(&self) {
        self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
        counter!("map_cache_misses_total").increment(1);
    }

    pub fn record_query(&self, kind: &'static str, elapsed: Duration, ok: bool) {
        histogram!("map_query_duration_ms", "kind" => kind).record(elapsed.as_secs_f64() * 1000.0);
        if !ok {
            self.counters.query_errors.fetch_add(1, Ordering::Relaxed);
            counter!("map_query_errors_total", "kind" => kind).increment(1);
        }
    }

    pub fn record_upstream_duration(&self, kind: &'static str, elapsed: Duration) {
        histogram!("map_upstream_duration_ms", "kind" => kind)
            .record(elapsed.as_secs_f64() * 1000.0);
    }

    /// Publish response cache occupancy as gauges.
    pub fn record_cache_stats(&self, stats: &CacheStats) {
        gauge!("map_cache_entries").set(stats.entry_count() as f64);
        gauge!("map_cache_size_bytes").set(stats.size_bytes() as f64);
        gauge!("map_cache_hit_rate_percent").set(stats.hit_rate());
    }

    pub fn requests(&self) -> u64 {
        self.counters.requests.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.counters.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.counters.cache_misses.load(Ordering::Relaxed)
    }

    pub fn query_errors(&self) -> u64 {
        self.counters.query_errors.load(Ordering::Relaxed)
    }
}
