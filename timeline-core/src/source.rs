//! Source Client seam

use crate::{CaseId, CollectionOutcome, Source};
use async_trait::async_trait;
use tokio::time::Instant;

/// Adapter that turns a case id into one bounded upstream read.
///
/// Implementations make exactly one call, never retry, and report every
/// failure as a [`CollectionOutcome`] variant instead of an error. `deadline`
/// is absolute; a call still running at the deadline must resolve to
/// [`CollectionOutcome::Timeout`].
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Which upstream this client reads.
    fn source(&self) -> Source;

    async fn fetch(&self, case_id: &CaseId, deadline: Instant) -> CollectionOutcome;
}
