//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every routed request in an `http_request` span (continuing any W3C
//! `traceparent` the caller sent) and records request counters and latency
//! against the route template, never the raw path, so case ids do not become
//! metric labels.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use opentelemetry::{global, propagation::TextMapPropagator as _};
use opentelemetry_http::HeaderExtractor;
use tracing::{field, info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::metrics::TimelineMetrics;

/// Label used when a request did not match any route.
const UNMATCHED_ROUTE: &str = "unmatched";

fn route_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// Observability middleware for Axum.
///
/// Install with `route_layer` so the matched route template is available.
pub async fn observability_middleware(
    State(metrics): State<Arc<TimelineMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let route = route_label(request.extensions().get::<MatchedPath>());

    let parent_context =
        global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(request.headers())));

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %route,
        http.status_code = field::Empty,
        otel.kind = "server",
    );
    let _ = span.set_parent(parent_context);

    let response = next.run(request).instrument(span.clone()).await;

    let duration = start.elapsed();
    let status = response.status();
    span.record("http.status_code", status.as_u16());

    metrics.record_http_request(method.as_str(), &route, status.as_u16(), duration.as_secs_f64());

    tracing::info!(
        method = %method,
        route = %route,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
