//! In-process cache store backed by `DashMap`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::key::TimelineCacheKey;
use super::traits::{CacheResult, CacheStats, CacheStore};

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// Memory cache store with lazy expiry on read.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, StoredValue>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &TimelineCacheKey) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let live = self
            .entries
            .get(key.as_str())
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.bytes.clone());

        match live {
            Some(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(bytes))
            }
            None => {
                // The read guard above is released, so removal cannot deadlock.
                self.entries
                    .remove_if(key.as_str(), |_, stored| stored.expires_at <= now);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &TimelineCacheKey, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(u32::MAX as u64));
        self.entries.insert(
            key.as_str().to_string(),
            StoredValue {
                bytes: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &TimelineCacheKey) -> CacheResult<bool> {
        Ok(self.entries.remove(key.as_str()).is_some())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_core::CaseId;

    fn key(raw: &str) -> TimelineCacheKey {
        TimelineCacheKey::for_case(&CaseId::parse(raw).unwrap())
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryCacheStore::new();
        store
            .set(&key("a"), b"hello".to_vec(), Duration::from_secs(60))
            .await
            .expect("set should succeed");

        let value = store.get(&key("a")).await.expect("get should succeed");
        assert_eq!(value.as_deref(), Some(&b"hello"[..]));
        assert_eq!(store.get(&key("b")).await.unwrap(), None);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_set_replaces_wholesale() {
        let store = MemoryCacheStore::new();
        let ttl = Duration::from_secs(60);
        store.set(&key("a"), b"first".to_vec(), ttl).await.unwrap();
        store.set(&key("a"), b"second".to_vec(), ttl).await.unwrap();
        assert_eq!(
            store.get(&key("a")).await.unwrap().as_deref(),
            Some(&b"second"[..])
        );
    }

    #[tokio::test]
    async fn test_expired_value_is_absent_and_collected() {
        let store = MemoryCacheStore::new();
        store
            .set(&key("a"), b"soon gone".to_vec(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(store.get(&key("a")).await.unwrap(), None);
        assert_eq!(store.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryCacheStore::new();
        store
            .set(&key("a"), b"x".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.delete(&key("a")).await.unwrap());
        assert!(!store.delete(&key("a")).await.unwrap());
        assert_eq!(store.get(&key("a")).await.unwrap(), None);
    }
}
