use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cache statistics snapshot for monitoring
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evicted: u64,
}

struct CacheEntry {
    payload: Vec<u8>,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

/// Sharded TTL cache of serialized platform objects.
///
/// Lookups and inserts are safe under arbitrary concurrent callers; the
/// map is internally sharded and counters are atomic, so no external
/// locking is required. A stale entry reports a miss immediately and is
/// reclaimed later by [`purge_expired`](MetadataCache::purge_expired).
pub struct MetadataCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evicted: AtomicU64,
}

impl MetadataCache {
    pub fn new(ttl: Duration) -> Self {
        tracing::info!(ttl_secs = ttl.as_secs(), "Creating metadata cache");

        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Get a payload if present and fresh.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_stale(self.ttl) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %key, "Cache hit");
                return Some(entry.payload.clone());
            }
            tracing::debug!(
                key = %key,
                age_secs = entry.stored_at.elapsed().as_secs(),
                "Cache entry stale"
            );
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a payload, replacing any previous entry wholesale.
    pub fn put(&self, key: impl Into<String>, payload: Vec<u8>) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Reclaim expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;

        self.entries.retain(|_, entry| !entry.is_stale(ttl));

        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.evicted.fetch_add(removed as u64, Ordering::Relaxed);
            tracing::info!(
                removed = removed,
                remaining = self.entries.len(),
                "Cleaned up expired cache entries"
            );
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }

    /// Log cache statistics (for periodic monitoring)
    pub fn log_stats(&self) {
        let stats = self.stats();
        let lookups = stats.hits + stats.misses;
        let hit_rate = if lookups > 0 {
            (stats.hits as f32 / lookups as f32 * 100.0) as u32
        } else {
            0
        };

        tracing::info!(
            entries = self.entries.len(),
            hits = stats.hits,
            misses = stats.misses,
            evicted = stats.evicted,
            hit_rate = hit_rate,
            "Metadata cache statistics"
        );
    }
}
