//! OpenAPI Specification for the Timeline API
//!
//! Generated by utoipa from the route annotations and schema derives.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{cases, health};
use crate::telemetry::metrics;
use crate::types::CaseView;
use timeline_core::{CaseId, Source, Timeline, TimelineEvent};

/// OpenAPI document for the Timeline API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Support Case Timeline API",
        version = "0.1.0",
        description = "Aggregated, cached event timelines for support cases"
    ),
    tags(
        (name = "Cases", description = "Support case views and timeline cache control"),
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        cases::get_case,
        cases::refresh_timeline,
        cases::invalidate_timeline,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        CaseView,
        CaseId,
        Timeline,
        TimelineEvent,
        Source,
        ApiError,
        ErrorCode,
        health::HealthResponse,
        health::HealthStatus,
        health::HealthDetails,
        health::ComponentHealth,
    ))
)]
pub struct ApiDoc;
