//! Cache backend selection from `CACHE_BACKEND_URL`.
//!
//! - `memory://` selects the in-process [`MemoryCacheStore`].
//! - `lmdb:///path/to/dir` selects a [`LmdbCacheStore`] rooted at that directory.

use std::path::PathBuf;
use std::sync::Arc;

use timeline_core::CacheError;

use super::lmdb_backend::LmdbCacheStore;
use super::memory_backend::MemoryCacheStore;
use super::traits::{CacheResult, CacheStore};

/// LMDB map size used when opening from a URL.
pub const DEFAULT_LMDB_MAP_SIZE_MB: usize = 256;

/// Parsed cache backend location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackendUrl {
    Memory,
    Lmdb { path: PathBuf },
}

impl CacheBackendUrl {
    pub fn parse(url: &str) -> CacheResult<Self> {
        let unsupported = || CacheError::UnsupportedBackend {
            url: url.to_string(),
        };
        let trimmed = url.trim();

        if let Some(rest) = trimmed.strip_prefix("memory://") {
            return if rest.is_empty() {
                Ok(Self::Memory)
            } else {
                Err(unsupported())
            };
        }

        if let Some(path) = trimmed.strip_prefix("lmdb://") {
            if !path.starts_with('/') || path.len() < 2 {
                return Err(unsupported());
            }
            return Ok(Self::Lmdb {
                path: PathBuf::from(path),
            });
        }

        Err(unsupported())
    }

    /// Open the backend this URL describes.
    pub fn open(&self) -> CacheResult<Arc<dyn CacheStore>> {
        match self {
            Self::Memory => Ok(Arc::new(MemoryCacheStore::new())),
            Self::Lmdb { path } => {
                let store = LmdbCacheStore::open(path, DEFAULT_LMDB_MAP_SIZE_MB)?;
                Ok(Arc::new(store))
            }
        }
    }
}

/// Parse `url` and open the backend it names.
pub fn open_cache_store(url: &str) -> CacheResult<Arc<dyn CacheStore>> {
    let backend = CacheBackendUrl::parse(url)?;
    let store = backend.open()?;
    tracing::info!(backend = store.backend_name(), "Cache backend opened");
    Ok(store)
}
