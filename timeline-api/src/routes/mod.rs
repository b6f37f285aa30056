//! REST API Routes Module
//!
//! Includes:
//! - Support case endpoints under /support/cases
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics at /metrics
//! - OpenAPI document at /openapi.json
//! - CORS support for browser-based agent consoles

pub mod cases;
pub mod health;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use cases::create_router as cases_router;
pub use health::create_router as health_router;

/// Slack on top of the aggregation deadline for cache I/O and serialization.
pub const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// The request timeout actually applied: never shorter than the aggregation
/// deadline plus [`REQUEST_TIMEOUT_MARGIN`], so a slow upstream yields a
/// degraded timeline rather than a 408.
pub fn effective_request_timeout(config: &ApiConfig, aggregation_deadline: Duration) -> Duration {
    let floor = aggregation_deadline.saturating_add(REQUEST_TIMEOUT_MARGIN);
    if config.request_timeout < floor {
        tracing::warn!(
            configured_ms = config.request_timeout.as_millis() as u64,
            applied_ms = floor.as_millis() as u64,
            "Request timeout shorter than aggregation deadline, raising it"
        );
        floor
    } else {
        config.request_timeout
    }
}

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Build the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. CORS - handles preflight requests
/// 2. Request timeout
/// 3. Observability - tracing and metrics, matched routes only
pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let metrics = state.metrics.clone();
    let request_timeout =
        effective_request_timeout(config, state.aggregator.config().aggregation_deadline);

    Router::new()
        .nest("/support/cases", cases::create_router())
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_json))
        .route_layer(from_fn_with_state(metrics, observability_middleware))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(build_cors_layer(config))
        .with_state(state)
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if !config.is_production() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::HeaderName::from_static("traceparent")])
    }
}
