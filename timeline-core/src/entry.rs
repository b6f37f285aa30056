//! Cached timeline snapshots

use crate::{CaseId, Timeline, Timestamp};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One cached timeline. Written once and replaced wholesale, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub case_id: CaseId,
    pub timeline: Timeline,
    pub stored_at: Timestamp,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    pub fn new(case_id: CaseId, timeline: Timeline, stored_at: Timestamp, ttl: Duration) -> Self {
        Self {
            case_id,
            timeline,
            stored_at,
            ttl_seconds: ttl.as_secs(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn expires_at(&self) -> Timestamp {
        i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .and_then(|ttl| self.stored_at.checked_add_signed(ttl))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
    }

    /// Whether the entry may be served at `now`. An entry read at or after
    /// `stored_at + ttl` is treated as absent.
    pub fn is_fresh_at(&self, now: Timestamp) -> bool {
        now < self.expires_at()
    }

    pub fn into_timeline(self) -> Timeline {
        self.timeline
    }
}
