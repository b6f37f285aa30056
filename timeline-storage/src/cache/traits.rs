//! Cache store trait.
//!
//! Byte-level key/value store with TTL. Backends know nothing about
//! timelines; [`TimelineCache`](super::TimelineCache) owns serialization.

use async_trait::async_trait;
use std::time::Duration;
use timeline_core::CacheError;

use super::key::TimelineCacheKey;

/// Result type for cache store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Pluggable cache backend.
///
/// Implementations must be safe for concurrent use. Every `set` is a
/// full-value replacement, so callers need no external locking: concurrent
/// writers for the same key resolve as last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Fetch a value. Values past their TTL are reported as absent.
    async fn get(&self, key: &TimelineCacheKey) -> CacheResult<Option<Vec<u8>>>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &TimelineCacheKey, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove a value. Returns whether anything was removed.
    async fn delete(&self, key: &TimelineCacheKey) -> CacheResult<bool>;

    /// Cheap reachability check used by readiness.
    async fn ping(&self) -> CacheResult<()>;

    /// Get cache statistics.
    async fn stats(&self) -> CacheResult<CacheStats>;
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that found a live value.
    pub hits: u64,
    /// Number of reads that found nothing or an expired value.
    pub misses: u64,
    /// Number of entries currently stored, including not yet collected expired ones.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
