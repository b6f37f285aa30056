//! Refresh Controller
//!
//! Operator-triggered rebuild of a case timeline: the cached entry is
//! dropped, then the timeline is collected with the cache read bypassed.

use std::sync::Arc;

use timeline_core::{CaseId, Timeline};

use super::aggregator::{TimelineAggregator, TimelineOptions};

#[derive(Debug, Clone)]
pub struct RefreshController {
    aggregator: Arc<TimelineAggregator>,
}

impl RefreshController {
    pub fn new(aggregator: Arc<TimelineAggregator>) -> Self {
        Self { aggregator }
    }

    /// Invalidate and recollect. A failed invalidation is logged and the
    /// forced collection still runs, since it overwrites the entry anyway.
    #[tracing::instrument(skip(self, case_id), fields(case_id = %case_id))]
    pub async fn refresh(&self, case_id: &CaseId) -> Timeline {
        if let Err(e) = self.aggregator.invalidate(case_id).await {
            tracing::warn!(error = %e, "Invalidation before refresh failed");
        }
        self.aggregator
            .get_timeline(case_id, TimelineOptions::forced())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TimelineMetrics;
    use timeline_core::{Source, SystemClock, TimelineConfig};
    use timeline_storage::TimelineCache;
    use timeline_test_utils::{as_client, fixtures, FailingCacheStore, ScriptedSource};

    #[tokio::test]
    async fn test_refresh_survives_unavailable_cache() {
        let order = ScriptedSource::succeeding(
            Source::Order,
            vec![fixtures::event(Source::Order, 0, "order.placed")],
        );
        let aggregator = TimelineAggregator::new(
            vec![as_client(&order)],
            TimelineCache::new(Arc::new(FailingCacheStore::new())),
            Arc::new(TimelineConfig::default()),
            Arc::new(TimelineMetrics::new().expect("metrics")),
            Arc::new(SystemClock),
        );
        let controller = RefreshController::new(Arc::new(aggregator));

        let timeline = controller.refresh(&fixtures::case_id("CASE-9")).await;
        assert_eq!(timeline.events.len(), 1);
        assert!(!timeline.degraded);
        assert_eq!(order.calls(), 1);
    }
}
