//! Cache key scheme for timeline snapshots.
//!
//! Keys can only be built from a validated [`CaseId`], so every key in the
//! store has the shape `support:timeline:{caseId}` and nothing else.

use std::fmt;
use timeline_core::CaseId;

/// Namespace prefix shared by every timeline snapshot key.
pub const TIMELINE_KEY_PREFIX: &str = "support:timeline:";

/// Cache key for one case's timeline snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimelineCacheKey {
    encoded: String,
}

impl TimelineCacheKey {
    pub fn for_case(case_id: &CaseId) -> Self {
        Self {
            encoded: format!("{TIMELINE_KEY_PREFIX}{case_id}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.encoded.as_bytes()
    }
}

impl fmt::Display for TimelineCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}
