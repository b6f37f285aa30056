//! Timeline snapshot cache.
//!
//! Two layers:
//!
//! - [`CacheStore`]: byte-level key/value store with TTL. Implemented by
//!   [`MemoryCacheStore`] (`dashmap`) and [`LmdbCacheStore`] (`heed`).
//! - [`TimelineCache`]: typed wrapper that owns the key scheme
//!   ([`TimelineCacheKey`]) and the JSON encoding of [`CacheEntry`](timeline_core::CacheEntry).
//!
//! Both backends also enforce TTL natively (lazy expiry on read). The
//! aggregator still checks `stored_at + ttl` itself, so a backend that never
//! expires anything stays correct.

pub mod backend_url;
pub mod key;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod timeline_cache;
pub mod traits;

pub use backend_url::{open_cache_store, CacheBackendUrl};
pub use key::{TimelineCacheKey, TIMELINE_KEY_PREFIX};
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory_backend::MemoryCacheStore;
pub use timeline_cache::TimelineCache;
pub use traits::{CacheResult, CacheStats, CacheStore};
