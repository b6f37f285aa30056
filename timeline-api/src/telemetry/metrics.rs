//! Prometheus Metrics Definitions
//!
//! The Metrics Recorder for timeline aggregation. Every metric lives in a
//! registry owned by the [`TimelineMetrics`] instance rather than the
//! process-wide default registry, so tests can build as many independent
//! recorders as they like. Exposed on `/metrics` for Prometheus scraping.
//!
//! Recording never fails and never influences control flow.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use timeline_core::{CollectionOutcome, FailureStage, Source};

use crate::error::{ApiError, ApiResult};

/// Timeline collection latency buckets (seconds)
/// Covers: 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2s, 5s, 10s
const COLLECT_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.0, 5.0, 10.0,
];

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Where a timeline was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencySource {
    Cache,
    Remote,
}

impl LatencySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LatencySource::Cache => "cache",
            LatencySource::Remote => "remote",
        }
    }
}

/// Cache interactions worth counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Hit,
    Miss,
    Write,
    Invalidate,
    Error,
}

impl CacheEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEvent::Hit => "hit",
            CacheEvent::Miss => "miss",
            CacheEvent::Write => "write",
            CacheEvent::Invalidate => "invalidate",
            CacheEvent::Error => "error",
        }
    }
}

/// Container for all timeline metrics plus the registry that owns them.
#[derive(Clone)]
pub struct TimelineMetrics {
    registry: Registry,

    /// Timeline collection latency - labels: source (cache, remote)
    pub collect_seconds: HistogramVec,

    /// Cache event counter - labels: event
    pub cache_events_total: IntCounterVec,

    /// Collection failure counter - labels: stage (http, decode, aggregate)
    pub collection_failures_total: IntCounterVec,

    /// Per-source outcome counter - labels: source, outcome
    pub source_outcomes_total: IntCounterVec,

    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,
}

impl TimelineMetrics {
    /// Create all metrics and register them with a fresh registry.
    pub fn new() -> ApiResult<Self> {
        let registry = Registry::new();

        let collect_seconds = HistogramVec::new(
            HistogramOpts::new(
                "support_timeline_collect_seconds",
                "Time to produce a case timeline",
            )
            .buckets(COLLECT_LATENCY_BUCKETS.to_vec()),
            &["source"],
        )
        .map_err(|e| metric_error("support_timeline_collect_seconds", e))?;

        let cache_events_total = IntCounterVec::new(
            Opts::new(
                "support_timeline_cache_events_total",
                "Timeline cache events by type",
            ),
            &["event"],
        )
        .map_err(|e| metric_error("support_timeline_cache_events_total", e))?;

        let collection_failures_total = IntCounterVec::new(
            Opts::new(
                "support_timeline_collection_failures_total",
                "Timeline collection failures by stage",
            ),
            &["stage"],
        )
        .map_err(|e| metric_error("support_timeline_collection_failures_total", e))?;

        let source_outcomes_total = IntCounterVec::new(
            Opts::new(
                "support_timeline_source_outcomes_total",
                "Per-source collection outcomes",
            ),
            &["source", "outcome"],
        )
        .map_err(|e| metric_error("support_timeline_source_outcomes_total", e))?;

        let http_requests_total = CounterVec::new(
            Opts::new("timeline_http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )
        .map_err(|e| metric_error("timeline_http_requests_total", e))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "timeline_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(HTTP_LATENCY_BUCKETS.to_vec()),
            &["method", "path"],
        )
        .map_err(|e| metric_error("timeline_http_request_duration_seconds", e))?;

        registry
            .register(Box::new(collect_seconds.clone()))
            .map_err(|e| metric_error("support_timeline_collect_seconds", e))?;
        registry
            .register(Box::new(cache_events_total.clone()))
            .map_err(|e| metric_error("support_timeline_cache_events_total", e))?;
        registry
            .register(Box::new(collection_failures_total.clone()))
            .map_err(|e| metric_error("support_timeline_collection_failures_total", e))?;
        registry
            .register(Box::new(source_outcomes_total.clone()))
            .map_err(|e| metric_error("support_timeline_source_outcomes_total", e))?;
        registry
            .register(Box::new(http_requests_total.clone()))
            .map_err(|e| metric_error("timeline_http_requests_total", e))?;
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .map_err(|e| metric_error("timeline_http_request_duration_seconds", e))?;

        Ok(Self {
            registry,
            collect_seconds,
            cache_events_total,
            collection_failures_total,
            source_outcomes_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Record how long a timeline took to produce.
    pub fn observe_collect(&self, source: LatencySource, seconds: f64) {
        self.collect_seconds
            .with_label_values(&[source.as_str()])
            .observe(seconds);
    }

    /// Record a cache event.
    pub fn record_cache_event(&self, event: CacheEvent) {
        self.cache_events_total
            .with_label_values(&[event.as_str()])
            .inc();
    }

    /// Record a collection failure.
    pub fn record_collection_failure(&self, stage: FailureStage) {
        self.collection_failures_total
            .with_label_values(&[stage.as_str()])
            .inc();
    }

    /// Record one source's outcome, plus a failure if it was one.
    pub fn record_source_outcome(&self, source: Source, outcome: &CollectionOutcome) {
        self.source_outcomes_total
            .with_label_values(&[source.as_str(), outcome.label()])
            .inc();
        if let Some(stage) = outcome.failure_stage() {
            self.record_collection_failure(stage);
        }
    }

    /// Record a source whose client panicked. Counted as an aggregate-stage failure.
    pub fn record_source_panic(&self, source: Source) {
        self.source_outcomes_total
            .with_label_values(&[source.as_str(), "panic"])
            .inc();
        self.record_collection_failure(FailureStage::Aggregate);
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    // ========================================================================
    // Readback
    // ========================================================================

    pub fn cache_event_count(&self, event: CacheEvent) -> u64 {
        self.cache_events_total
            .with_label_values(&[event.as_str()])
            .get()
    }

    pub fn collection_failure_count(&self, stage: FailureStage) -> u64 {
        self.collection_failures_total
            .with_label_values(&[stage.as_str()])
            .get()
    }

    pub fn source_outcome_count(&self, source: Source, outcome: &str) -> u64 {
        self.source_outcomes_total
            .with_label_values(&[source.as_str(), outcome])
            .get()
    }

    /// Number of latency observations for a source label.
    pub fn collect_sample_count(&self, source: LatencySource) -> u64 {
        self.collect_seconds
            .with_label_values(&[source.as_str()])
            .get_sample_count()
    }

    /// Encode every metric in Prometheus text exposition format.
    pub fn encode_text(&self) -> ApiResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| ApiError::internal_error(format!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| ApiError::internal_error(format!("Metrics are not UTF-8: {}", e)))
    }
}

fn metric_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler(State(metrics): State<Arc<TimelineMetrics>>) -> impl IntoResponse {
    match metrics.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.message,
            )
        }
    }
}
