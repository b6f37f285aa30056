//! Timeline Core - Data Types
//!
//! Shared vocabulary for case timeline aggregation: identifiers, events,
//! per-source outcomes, the merged timeline, cache entries, configuration and
//! the Source Client seam. All other crates depend on this one.

mod clock;
mod config;
mod entry;
mod error;
mod event;
mod identity;
mod outcome;
mod source;
mod timeline;

pub use clock::{Clock, SystemClock};
pub use config::{
    TimelineConfig, CASE_ID_PLACEHOLDER, DEFAULT_AGGREGATION_DEADLINE, DEFAULT_CACHE_BACKEND_URL,
    DEFAULT_CACHE_TTL, DEFAULT_DEGRADED_TTL, DEFAULT_PER_SOURCE_TIMEOUT, DEFAULT_UPSTREAM_PATH,
};
pub use entry::CacheEntry;
pub use error::{CacheError, ConfigError, TimelineError, ValidationError};
pub use event::{Source, TimelineEvent};
pub use identity::{CaseId, Timestamp, MAX_CASE_ID_LEN};
pub use outcome::{CollectionOutcome, FailureStage};
pub use source::SourceClient;
pub use timeline::Timeline;
