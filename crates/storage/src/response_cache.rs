//! In-memory LRU cache for encoded responses.
//!
//! Holds MVT tiles, GeoJSON slices and proxied raster tiles keyed by
//! everything that shapes the response body (endpoint, layer, tile or
//! quantised bbox, filters). Entries expire after a TTL that is fixed per
//! entry at insertion time.
//!
//! ## Memory-Based Eviction
//!
//! The cache is bounded by total body size, not entry count. When an insert
//! would push it over the limit, ~5% of the capacity is freed in one batch
//! in LRU order.
//!
//! Concurrent writers to one key are last-writer-wins; there is no request
//! coalescing.

use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::info;

/// Entry limit handed to `LruCache`; eviction is driven by bytes instead.
const LRU_CAPACITY: usize = 1_000_000;

/// A cached response body and its media type.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub content_type: String,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    fn size(&self) -> u64 {
        (self.body.len() + self.content_type.len()) as u64
    }
}

struct CacheEntry {
    response: CachedResponse,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Counters for the response cache, readable without taking the lock.
#[derive(Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub expired: AtomicU64,
    pub size_bytes: AtomicU64,
    pub entry_count: AtomicU64,
}

impl CacheStats {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed)
    }
}

pub struct ResponseCache {
    cache: Arc<RwLock<LruCache<String, CacheEntry>>>,
    max_bytes: u64,
    default_ttl: Duration,
    stats: Arc<CacheStats>,
}

impl ResponseCache {
    /// Create a cache bounded to `max_size_mb` megabytes of bodies.
    pub fn new(max_size_mb: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(LRU_CAPACITY).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Arc::new(RwLock::new(LruCache::new(capacity))),
            max_bytes: (max_size_mb as u64) * 1024 * 1024,
            default_ttl,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Look up `key`, dropping the entry if its TTL has passed.
    pub async fn get(&self, key: &str) -> Option<CachedResponse> {
        // LRU promotion on read needs the write lock.
        let mut cache = self.cache.write().await;

        match cache.get(key) {
            Some(entry) if entry.is_expired() => {
                let size = entry.response.size();
                cache.pop(key);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                self.stats.size_bytes.fetch_sub(size, Ordering::Relaxed);
                self.stats.entry_count.fetch_sub(1, Ordering::Relaxed);
                None
            }
            Some(entry) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.response.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `response` under `key` with `ttl`, or the default TTL.
    ///
    /// Bodies larger than the whole cache are not stored.
    pub async fn put(&self, key: &str, response: CachedResponse, ttl: Option<Duration>) {
        let size = response.size();
        if size > self.max_bytes {
            return;
        }

        let mut cache = self.cache.write().await;

        if let Some(existing) = cache.pop(key) {
            self.stats
                .size_bytes
                .fetch_sub(existing.response.size(), Ordering::Relaxed);
            self.stats.entry_count.fetch_sub(1, Ordering::Relaxed);
        }

        if self.stats.size_bytes.load(Ordering::Relaxed) + size > self.max_bytes {
            self.evict_batch_locked(&mut cache, size);
        }

        cache.put(
            key.to_string(),
            CacheEntry {
                response,
                inserted_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
            },
        );
        self.stats.size_bytes.fetch_add(size, Ordering::Relaxed);
        self.stats.entry_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Free at least 5% of capacity, and at least `needed` bytes, in LRU
    /// order. Takes the already-locked map.
    fn evict_batch_locked(&self, cache: &mut LruCache<String, CacheEntry>, needed: u64) {
        let current = self.stats.size_bytes.load(Ordering::Relaxed);
        let overflow = (current + needed).saturating_sub(self.max_bytes);
        let target_free = (self.max_bytes / 20).max(overflow);

        let mut bytes_freed = 0u64;
        let mut entries_evicted = 0u64;
        while bytes_freed < target_free {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    bytes_freed += evicted.response.size();
                    entries_evicted += 1;
                }
                None => break,
            }
        }

        self.stats.size_bytes.fetch_sub(bytes_freed, Ordering::Relaxed);
        self.stats
            .entry_count
            .fetch_sub(entries_evicted, Ordering::Relaxed);
        self.stats
            .evictions
            .fetch_add(entries_evicted, Ordering::Relaxed);

        info!(
            entries_evicted = entries_evicted,
            bytes_freed_mb = format!("{:.2}", bytes_freed as f64 / (1024.0 * 1024.0)),
            max_size_mb = format!("{:.2}", self.max_bytes as f64 / (1024.0 * 1024.0)),
            "Response cache batch eviction completed"
        );
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn len(&self) -> usize {
        self.stats.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
