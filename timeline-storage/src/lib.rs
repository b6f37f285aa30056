//! Timeline Storage - cache backends for timeline snapshots

pub mod cache;

pub use cache::{
    open_cache_store, CacheBackendUrl, CacheResult, CacheStats, CacheStore, LmdbCacheError,
    LmdbCacheStore, MemoryCacheStore, TimelineCache, TimelineCacheKey, TIMELINE_KEY_PREFIX,
};
