//! Health Check Endpoints
//!
//! Kubernetes-compatible health checks:
//! - /health/live - Process alive check
//! - /health/ready - Cache backend reachability
//!
//! An unreachable cache does not fail readiness: timelines are still served
//! straight from the upstreams, so readiness reports `degraded` with 200.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use timeline_storage::TimelineCache;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub cache: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_rate: Option<f64>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/live - Process liveness check
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
)]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check (cache reachability)
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready, possibly without its cache", body = HealthResponse),
    ),
)]
pub async fn readiness(
    State(cache): State<TimelineCache>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let cache_health = check_cache(&cache).await;

    let overall_status = if cache_health.status == HealthStatus::Healthy {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(HealthDetails {
            cache: cache_health,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    (StatusCode::OK, Json(response))
}

async fn check_cache(cache: &TimelineCache) -> ComponentHealth {
    let start = Instant::now();
    match cache.ping().await {
        Ok(()) => {
            let latency_ms = Some(start.elapsed().as_millis() as u64);
            // Stats are informational; a failure here does not change the status.
            let stats = match cache.stats().await {
                Ok(stats) => Some(stats),
                Err(e) => {
                    tracing::debug!(error = %e, "Cache stats unavailable");
                    None
                }
            };
            ComponentHealth {
                status: HealthStatus::Healthy,
                backend: cache.backend_name().to_string(),
                latency_ms,
                error: None,
                entries: stats.map(|s| s.entry_count),
                hit_rate: stats.map(|s| s.hit_rate()),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cache readiness check failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                backend: cache.backend_name().to_string(),
                latency_ms: None,
                error: Some(e.to_string()),
                entries: None,
                hit_rate: None,
            }
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Health check routes, mounted under `/health`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
