//! Timeline Test Utilities
//!
//! Shared test infrastructure for the timeline workspace:
//! - Scripted Source Client doubles with call counters
//! - Cache stores that always fail, for fail-open tests
//! - A manually driven clock for TTL tests
//! - Proptest generators and event fixtures

pub use timeline_core::{
    CacheEntry, CacheError, CaseId, Clock, CollectionOutcome, Source, SourceClient, Timeline,
    TimelineConfig, TimelineEvent, Timestamp,
};
pub use timeline_storage::{CacheResult, CacheStats, CacheStore, MemoryCacheStore, TimelineCacheKey};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// SOURCE DOUBLES
// ============================================================================

/// What a [`ScriptedSource`] does when fetched.
#[derive(Debug, Clone)]
pub enum SourceScript {
    /// Resolve immediately with this outcome.
    Respond(CollectionOutcome),
    /// Sleep, then resolve with this outcome. Ignores the deadline.
    Delay(Duration, CollectionOutcome),
    /// Never resolve.
    Hang,
    /// Panic inside the fetch.
    Panic,
}

/// Source Client double driven by a replaceable script.
///
/// Deliberately ignores the deadline it is given, so tests observe that the
/// aggregator enforces deadlines on its own.
#[derive(Debug)]
pub struct ScriptedSource {
    source: Source,
    script: Mutex<SourceScript>,
    calls: AtomicUsize,
    deadlines: Mutex<Vec<Instant>>,
}

impl ScriptedSource {
    pub fn new(source: Source, script: SourceScript) -> Arc<Self> {
        Arc::new(Self {
            source,
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            deadlines: Mutex::new(Vec::new()),
        })
    }

    /// A source that returns `events` successfully.
    pub fn succeeding(source: Source, events: Vec<TimelineEvent>) -> Arc<Self> {
        Self::new(source, SourceScript::Respond(CollectionOutcome::Success(events)))
    }

    /// A source that always resolves with `outcome`.
    pub fn responding(source: Source, outcome: CollectionOutcome) -> Arc<Self> {
        Self::new(source, SourceScript::Respond(outcome))
    }

    pub fn set_script(&self, script: SourceScript) {
        *self.script.lock().unwrap_or_else(|p| p.into_inner()) = script;
    }

    /// Number of times `fetch` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Deadline passed on the most recent call.
    pub fn last_deadline(&self) -> Option<Instant> {
        self.deadlines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .last()
            .copied()
    }
}

#[async_trait]
impl SourceClient for ScriptedSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self, _case_id: &CaseId, deadline: Instant) -> CollectionOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.deadlines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(deadline);
        let script = self.script.lock().unwrap_or_else(|p| p.into_inner()).clone();

        match script {
            SourceScript::Respond(outcome) => outcome,
            SourceScript::Delay(delay, outcome) => {
                tokio::time::sleep(delay).await;
                outcome
            }
            SourceScript::Hang => std::future::pending().await,
            SourceScript::Panic => panic!("scripted source panic"),
        }
    }
}

/// Coerce a scripted source into the trait object the aggregator takes.
pub fn as_client(source: &Arc<ScriptedSource>) -> Arc<dyn SourceClient> {
    source.clone()
}

// ============================================================================
// CACHE DOUBLES
// ============================================================================

/// Cache store whose every operation fails as unreachable.
#[derive(Debug, Default)]
pub struct FailingCacheStore {
    calls: AtomicUsize,
}

impl FailingCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> CacheResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::unavailable("failing", "connection refused"))
    }
}

#[async_trait]
impl CacheStore for FailingCacheStore {
    fn backend_name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &TimelineCacheKey) -> CacheResult<Option<Vec<u8>>> {
        self.fail()
    }

    async fn set(&self, _key: &TimelineCacheKey, _value: Vec<u8>, _ttl: Duration) -> CacheResult<()> {
        self.fail()
    }

    async fn delete(&self, _key: &TimelineCacheKey) -> CacheResult<bool> {
        self.fail()
    }

    async fn ping(&self) -> CacheResult<()> {
        self.fail()
    }

    async fn stats(&self) -> CacheResult<CacheStats> {
        self.fail()
    }
}

// ============================================================================
// CLOCK
// ============================================================================

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            now: RwLock::new(start),
        })
    }

    /// A clock starting at [`fixtures::epoch`].
    pub fn at_epoch() -> Arc<Self> {
        Self::new(fixtures::epoch())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|p| p.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::days(36_500));
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.write().unwrap_or_else(|p| p.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(|p| p.into_inner())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for timeline types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_source() -> impl Strategy<Value = Source> {
        prop_oneof![
            Just(Source::Order),
            Just(Source::Payment),
            Just(Source::Fulfillment),
        ]
    }

    /// Timestamps within a small window so collisions are common.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (0i64..30).prop_map(fixtures::at)
    }

    pub fn arb_kind() -> impl Strategy<Value = String> {
        "[a-z]{3,12}"
    }

    /// Events for one source, in emission order.
    pub fn arb_events(source: Source) -> impl Strategy<Value = Vec<TimelineEvent>> {
        prop::collection::vec((arb_timestamp(), arb_kind()), 0..8).prop_map(move |raw| {
            raw.into_iter()
                .map(|(at, kind)| TimelineEvent::new(source, at, kind))
                .collect()
        })
    }

    pub fn arb_case_id() -> impl Strategy<Value = CaseId> {
        "[A-Za-z0-9][A-Za-z0-9._-]{0,40}".prop_map(|raw| {
            CaseId::parse(&raw).unwrap_or_else(|e| panic!("generated invalid case id {raw:?}: {e}"))
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;

    /// Fixed reference instant all fixtures are relative to.
    pub fn epoch() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// `epoch() + secs`.
    pub fn at(secs: i64) -> Timestamp {
        epoch() + chrono::Duration::seconds(secs)
    }

    pub fn event(source: Source, secs: i64, kind: &str) -> TimelineEvent {
        TimelineEvent::new(source, at(secs), kind)
    }

    pub fn case_id(raw: &str) -> CaseId {
        CaseId::parse(raw).unwrap_or_else(|e| panic!("invalid fixture case id {raw:?}: {e}"))
    }

    /// One placed order, one captured payment and one shipment.
    pub fn happy_path_events() -> [(Source, Vec<TimelineEvent>); 3] {
        [
            (
                Source::Order,
                vec![event(Source::Order, 0, "order.placed").with_payload("total", "42.00")],
            ),
            (
                Source::Payment,
                vec![event(Source::Payment, 5, "payment.captured").with_payload("amount", "42.00")],
            ),
            (
                Source::Fulfillment,
                vec![event(Source::Fulfillment, 60, "shipment.dispatched")
                    .with_payload("carrier", "ups")],
            ),
        ]
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Timeline-specific assertions.

    use super::*;

    /// Assert events are in `(occurredAt, source)` order.
    #[track_caller]
    pub fn assert_ordered(timeline: &Timeline) {
        for pair in timeline.events.windows(2) {
            assert!(
                (pair[0].occurred_at, pair[0].source) <= (pair[1].occurred_at, pair[1].source),
                "events out of order: {:?} before {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// Assert the timeline is degraded with exactly `missing` absent.
    #[track_caller]
    pub fn assert_missing(timeline: &Timeline, missing: &[Source]) {
        assert!(timeline.degraded, "expected degraded timeline: {timeline:?}");
        let actual: Vec<Source> = timeline.missing_sources.iter().copied().collect();
        let mut expected = missing.to_vec();
        expected.sort();
        assert_eq!(actual, expected);
    }

    /// Assert the timeline is complete.
    #[track_caller]
    pub fn assert_complete(timeline: &Timeline) {
        assert!(!timeline.degraded, "expected complete timeline: {timeline:?}");
        assert!(timeline.missing_sources.is_empty());
    }
}
