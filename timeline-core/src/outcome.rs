//! Per-source collection outcomes

use crate::TimelineEvent;
use serde::{Deserialize, Serialize};

/// What one Source Client produced for one aggregation run.
///
/// Failures are data here, never errors: the aggregator folds them into
/// `degraded` and `missingSources` on the resulting timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOutcome {
    Success(Vec<TimelineEvent>),
    Timeout,
    /// `status` is `None` when no HTTP response arrived (connect or transport failure).
    UpstreamError { status: Option<u16> },
    DecodeError,
}

impl CollectionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CollectionOutcome::Success(_))
    }

    /// Label used for the per-source outcome metric.
    pub fn label(&self) -> &'static str {
        match self {
            CollectionOutcome::Success(_) => "success",
            CollectionOutcome::Timeout => "timeout",
            CollectionOutcome::UpstreamError { .. } => "upstream_error",
            CollectionOutcome::DecodeError => "decode_error",
        }
    }

    /// Failure stage this outcome counts against, if it is a failure.
    pub fn failure_stage(&self) -> Option<FailureStage> {
        match self {
            CollectionOutcome::Success(_) => None,
            CollectionOutcome::Timeout | CollectionOutcome::UpstreamError { .. } => {
                Some(FailureStage::Http)
            }
            CollectionOutcome::DecodeError => Some(FailureStage::Decode),
        }
    }
}

/// Where in the pipeline a collection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Http,
    Decode,
    /// The fan-out itself failed (a source task panicked or was cancelled).
    Aggregate,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Http => "http",
            FailureStage::Decode => "decode",
            FailureStage::Aggregate => "aggregate",
        }
    }
}
