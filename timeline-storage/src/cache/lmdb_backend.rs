//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a persistent,
//! memory-mapped snapshot store that survives process restarts.
//!
//! # Value Format
//!
//! `[expires_at: 8 bytes, i64 LE unix millis][payload bytes]`
//!
//! LMDB has no native expiry, so the deadline travels with the value and is
//! checked on every read. Expired values are reported as absent and removed
//! lazily.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use timeline_core::CacheError;

use super::key::TimelineCacheKey;
use super::traits::{CacheResult, CacheStats, CacheStore};

const EXPIRY_PREFIX_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CacheError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::unavailable("lmdb", e)
    }
}

/// Persistent cache store on a local LMDB environment.
pub struct LmdbCacheStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LmdbCacheStore {
    /// Open (or create) a store in `path` with a map size of `max_size_mb`.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn remove(&self, key: &[u8]) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, key)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(deleted)
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    fn backend_name(&self) -> &'static str {
        "lmdb"
    }

    async fn get(&self, key: &TimelineCacheKey) -> CacheResult<Option<Vec<u8>>> {
        let now_millis = Utc::now().timestamp_millis();

        let stored = {
            let rtxn = self
                .env
                .read_txn()
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

            self.db
                .get(&rtxn, key.as_bytes())
                .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?
                .map(<[u8]>::to_vec)
        };

        let Some(bytes) = stored else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let expires_at = bytes
            .get(..EXPIRY_PREFIX_LEN)
            .and_then(|prefix| <[u8; EXPIRY_PREFIX_LEN]>::try_from(prefix).ok())
            .map(i64::from_le_bytes)
            .ok_or_else(|| CacheError::Corrupt {
                key: key.to_string(),
                reason: "value shorter than expiry prefix".to_string(),
            })?;

        if expires_at <= now_millis {
            self.misses.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = self.remove(key.as_bytes()) {
                tracing::debug!(key = %key, error = %e, "Failed to collect expired LMDB entry");
            }
            return Ok(None);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(bytes[EXPIRY_PREFIX_LEN..].to_vec()))
    }

    async fn set(&self, key: &TimelineCacheKey, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_millis);

        let mut full_bytes = Vec::with_capacity(EXPIRY_PREFIX_LEN + value.len());
        full_bytes.extend_from_slice(&expires_at.to_le_bytes());
        full_bytes.extend_from_slice(&value);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, key.as_bytes(), &full_bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &TimelineCacheKey) -> CacheResult<bool> {
        Ok(self.remove(key.as_bytes())?)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.env
            .read_txn()
            .map(drop)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()).into())
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let entry_count = self
            .db
            .len(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        })
    }
}
