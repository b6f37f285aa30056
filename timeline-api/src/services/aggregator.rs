//! Timeline Aggregator
//!
//! Produces the timeline for a case. A fresh cached entry is returned as is;
//! otherwise every registered source is queried concurrently under a shared
//! deadline, the outcomes are merged, and the result is written back with a
//! TTL that depends on whether it came out degraded.
//!
//! Nothing here fails the caller. Cache faults are logged and counted, then
//! treated as a miss (on read) or ignored (on write).

use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use timeline_core::{
    CacheEntry, CacheError, CaseId, Clock, CollectionOutcome, FailureStage, Source, SourceClient,
    Timeline, TimelineConfig,
};
use timeline_storage::TimelineCache;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use crate::telemetry::{CacheEvent, LatencySource, TimelineMetrics};

/// Per-call options for [`TimelineAggregator::get_timeline`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelineOptions {
    /// Skip the cache read. The fresh result is still written back.
    pub force_refresh: bool,
}

impl TimelineOptions {
    pub fn forced() -> Self {
        Self {
            force_refresh: true,
        }
    }
}

/// Fans out to the registered sources and caches the merged result.
#[derive(Clone)]
pub struct TimelineAggregator {
    sources: BTreeMap<Source, Arc<dyn SourceClient>>,
    cache: TimelineCache,
    config: Arc<TimelineConfig>,
    metrics: Arc<TimelineMetrics>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TimelineAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineAggregator")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

impl TimelineAggregator {
    /// Build an aggregator over the given clients.
    ///
    /// At most one client per source is kept; a later duplicate is dropped
    /// with a warning.
    pub fn new(
        clients: Vec<Arc<dyn SourceClient>>,
        cache: TimelineCache,
        config: Arc<TimelineConfig>,
        metrics: Arc<TimelineMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut sources: BTreeMap<Source, Arc<dyn SourceClient>> = BTreeMap::new();
        for client in clients {
            let source = client.source();
            if sources.contains_key(&source) {
                tracing::warn!(source = %source, "Duplicate source client ignored");
                continue;
            }
            sources.insert(source, client);
        }

        Self {
            sources,
            cache,
            config,
            metrics,
            clock,
        }
    }

    /// Sources this aggregator will query, in precedence order.
    pub fn registered_sources(&self) -> Vec<Source> {
        self.sources.keys().copied().collect()
    }

    pub fn cache(&self) -> &TimelineCache {
        &self.cache
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Return the timeline for a case, from cache when fresh.
    #[tracing::instrument(skip(self, case_id), fields(case_id = %case_id, force_refresh = options.force_refresh))]
    pub async fn get_timeline(&self, case_id: &CaseId, options: TimelineOptions) -> Timeline {
        let started = Instant::now();

        if !options.force_refresh {
            if let Some(timeline) = self.read_cached(case_id).await {
                self.metrics
                    .observe_collect(LatencySource::Cache, started.elapsed().as_secs_f64());
                tracing::debug!("Timeline served from cache");
                return timeline;
            }
        }

        let outcomes = self.collect(case_id).await;
        let timeline = Timeline::merge(outcomes);
        self.metrics
            .observe_collect(LatencySource::Remote, started.elapsed().as_secs_f64());

        tracing::info!(
            events = timeline.events.len(),
            degraded = timeline.degraded,
            missing = ?timeline.missing_sources,
            "Timeline collected"
        );

        self.write_back(case_id, timeline).await
    }

    /// Drop the cached entry for a case. Returns whether one existed.
    pub async fn invalidate(&self, case_id: &CaseId) -> Result<bool, CacheError> {
        match self.cache.invalidate(case_id).await {
            Ok(existed) => {
                self.metrics.record_cache_event(CacheEvent::Invalidate);
                tracing::debug!(case_id = %case_id, existed, "Timeline cache entry invalidated");
                Ok(existed)
            }
            Err(e) => {
                self.metrics.record_cache_event(CacheEvent::Error);
                tracing::warn!(case_id = %case_id, error = %e, "Timeline cache invalidation failed");
                Err(e)
            }
        }
    }

    async fn read_cached(&self, case_id: &CaseId) -> Option<Timeline> {
        match self.cache.load(case_id).await {
            Ok(Some(entry)) if entry.is_fresh_at(self.clock.now()) => {
                self.metrics.record_cache_event(CacheEvent::Hit);
                Some(entry.into_timeline())
            }
            Ok(_) => {
                self.metrics.record_cache_event(CacheEvent::Miss);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Timeline cache read failed, collecting from sources");
                self.metrics.record_cache_event(CacheEvent::Error);
                self.metrics.record_cache_event(CacheEvent::Miss);
                None
            }
        }
    }

    async fn write_back(&self, case_id: &CaseId, timeline: Timeline) -> Timeline {
        let ttl = self.config.ttl_for(timeline.degraded);
        let entry = CacheEntry::new(case_id.clone(), timeline, self.clock.now(), ttl);

        match self.cache.store(&entry).await {
            Ok(()) => self.metrics.record_cache_event(CacheEvent::Write),
            Err(e) => {
                tracing::warn!(error = %e, "Timeline cache write failed");
                self.metrics.record_cache_event(CacheEvent::Error);
            }
        }

        entry.into_timeline()
    }

    /// Query every registered source concurrently and gather one outcome each.
    async fn collect(&self, case_id: &CaseId) -> BTreeMap<Source, CollectionOutcome> {
        let now = Instant::now();
        let aggregation_deadline = now + self.config.aggregation_deadline;
        let source_deadline = (now + self.config.per_source_timeout).min(aggregation_deadline);

        let mut tasks = JoinSet::new();
        for (&source, client) in &self.sources {
            let client = Arc::clone(client);
            let case_id = case_id.clone();
            tasks.spawn(async move {
                let fetch = AssertUnwindSafe(client.fetch(&case_id, source_deadline)).catch_unwind();
                let outcome = match timeout_at(source_deadline, fetch).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(_)) => {
                        tracing::error!(source = %source, "Source client panicked");
                        return (source, None);
                    }
                    Err(_) => CollectionOutcome::Timeout,
                };
                (source, Some(outcome))
            });
        }

        let mut outcomes = BTreeMap::new();
        let mut panicked = BTreeSet::new();
        loop {
            match timeout_at(aggregation_deadline, tasks.join_next()).await {
                Ok(Some(Ok((source, Some(outcome))))) => {
                    outcomes.insert(source, outcome);
                }
                Ok(Some(Ok((source, None)))) => {
                    panicked.insert(source);
                    outcomes.insert(source, CollectionOutcome::UpstreamError { status: None });
                }
                Ok(Some(Err(e))) => {
                    tracing::error!(error = %e, "Source collection task failed");
                    self.metrics.record_collection_failure(FailureStage::Aggregate);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        pending = tasks.len(),
                        "Aggregation deadline elapsed, abandoning pending sources"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        for &source in self.sources.keys() {
            outcomes.entry(source).or_insert(CollectionOutcome::Timeout);
        }

        for (&source, outcome) in &outcomes {
            if panicked.contains(&source) {
                self.metrics.record_source_panic(source);
                continue;
            }
            self.metrics.record_source_outcome(source, outcome);
            if !outcome.is_success() {
                tracing::debug!(source = %source, outcome = outcome.label(), "Source did not contribute");
            }
        }

        outcomes
    }
}
