//! Support case endpoints
//!
//! The case view with its optional timeline, an operator refresh, and a plain
//! cache invalidation.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use timeline_core::{CaseId, Timeline};

use crate::error::{ApiError, ApiResult};
use crate::services::{RefreshController, TimelineAggregator, TimelineOptions};
use crate::state::AppState;
use crate::types::{CaseQuery, CaseView};

/// GET /support/cases/{case_id} - Case view, optionally with its timeline
#[utoipa::path(
    get,
    path = "/support/cases/{case_id}",
    tag = "Cases",
    params(
        ("case_id" = String, Path, description = "Support case identifier"),
        CaseQuery,
    ),
    responses(
        (status = 200, description = "Case view", body = CaseView),
        (status = 400, description = "Invalid case id", body = ApiError),
    ),
)]
pub async fn get_case(
    State(aggregator): State<Arc<TimelineAggregator>>,
    Path(raw_case_id): Path<String>,
    Query(query): Query<CaseQuery>,
) -> ApiResult<Json<CaseView>> {
    let case_id = CaseId::parse(&raw_case_id)?;

    let timeline = if query.include_timeline {
        Some(
            aggregator
                .get_timeline(&case_id, TimelineOptions::default())
                .await,
        )
    } else {
        None
    };

    Ok(Json(CaseView { case_id, timeline }))
}

/// POST /support/cases/{case_id}/timeline/refresh - Rebuild the timeline
#[utoipa::path(
    post,
    path = "/support/cases/{case_id}/timeline/refresh",
    tag = "Cases",
    params(("case_id" = String, Path, description = "Support case identifier")),
    responses(
        (status = 200, description = "Freshly collected timeline", body = Timeline),
        (status = 400, description = "Invalid case id", body = ApiError),
    ),
)]
pub async fn refresh_timeline(
    State(refresh): State<Arc<RefreshController>>,
    Path(raw_case_id): Path<String>,
) -> ApiResult<Json<Timeline>> {
    let case_id = CaseId::parse(&raw_case_id)?;
    Ok(Json(refresh.refresh(&case_id).await))
}

/// DELETE /support/cases/{case_id}/timeline - Drop the cached timeline
#[utoipa::path(
    delete,
    path = "/support/cases/{case_id}/timeline",
    tag = "Cases",
    params(("case_id" = String, Path, description = "Support case identifier")),
    responses(
        (status = 204, description = "Cached timeline removed (or was absent)"),
        (status = 400, description = "Invalid case id", body = ApiError),
        (status = 503, description = "Cache unavailable", body = ApiError),
    ),
)]
pub async fn invalidate_timeline(
    State(aggregator): State<Arc<TimelineAggregator>>,
    Path(raw_case_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let case_id = CaseId::parse(&raw_case_id)?;
    aggregator.invalidate(&case_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Case routes, mounted under `/support/cases`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:case_id", get(get_case))
        .route("/:case_id/timeline/refresh", post(refresh_timeline))
        .route("/:case_id/timeline", delete(invalidate_timeline))
}
