//! Typed timeline snapshot cache over a byte-level [`CacheStore`].

use std::sync::Arc;

use timeline_core::{CacheEntry, CacheError, CaseId};

use super::key::TimelineCacheKey;
use super::traits::{CacheResult, CacheStats, CacheStore};

/// Serializes [`CacheEntry`] values as JSON under `support:timeline:{caseId}`.
///
/// Freshness is not judged here: a returned entry may be logically expired
/// and the caller compares `stored_at + ttl` against its own clock.
#[derive(Clone)]
pub struct TimelineCache {
    store: Arc<dyn CacheStore>,
}

impl TimelineCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Read the snapshot for a case.
    ///
    /// A value that does not deserialize is deleted best-effort and reported
    /// as [`CacheError::Corrupt`].
    pub async fn load(&self, case_id: &CaseId) -> CacheResult<Option<CacheEntry>> {
        let key = TimelineCacheKey::for_case(case_id);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.case_id == *case_id => Ok(Some(entry)),
            Ok(entry) => {
                self.discard(&key).await;
                Err(CacheError::Corrupt {
                    key: key.to_string(),
                    reason: format!("entry belongs to case {}", entry.case_id),
                })
            }
            Err(e) => {
                self.discard(&key).await;
                Err(CacheError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Replace the snapshot for the entry's case, with the entry's TTL.
    pub async fn store(&self, entry: &CacheEntry) -> CacheResult<()> {
        let key = TimelineCacheKey::for_case(&entry.case_id);
        let bytes = serde_json::to_vec(entry).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        self.store.set(&key, bytes, entry.ttl()).await
    }

    /// Remove the snapshot for a case. Returns whether one existed.
    pub async fn invalidate(&self, case_id: &CaseId) -> CacheResult<bool> {
        self.store.delete(&TimelineCacheKey::for_case(case_id)).await
    }

    pub async fn ping(&self) -> CacheResult<()> {
        self.store.ping().await
    }

    pub async fn stats(&self) -> CacheResult<CacheStats> {
        self.store.stats().await
    }

    async fn discard(&self, key: &TimelineCacheKey) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to delete corrupt cache entry");
        }
    }
}

impl std::fmt::Debug for TimelineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineCache")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}
