//! HTTP surface tests driven through the full router with `tower::ServiceExt`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use timeline_api::{create_router, ApiConfig, AppState, TimelineAggregator, TimelineMetrics};
use timeline_core::{Source, SourceClient, SystemClock, TimelineConfig};
use timeline_storage::{CacheStore, MemoryCacheStore, TimelineCache};
use timeline_test_utils::{as_client, fixtures, FailingCacheStore, ScriptedSource, SourceScript};
use tower::ServiceExt;

fn app_with(store: Arc<dyn CacheStore>, sources: &[Arc<ScriptedSource>]) -> Router {
    app_with_config(store, sources, TimelineConfig::default())
}

fn app_with_config(
    store: Arc<dyn CacheStore>,
    sources: &[Arc<ScriptedSource>],
    config: TimelineConfig,
) -> Router {
    create_router(state_with(store, sources, config), &ApiConfig::default())
}

fn state_with(
    store: Arc<dyn CacheStore>,
    sources: &[Arc<ScriptedSource>],
    config: TimelineConfig,
) -> AppState {
    let clients: Vec<Arc<dyn SourceClient>> = sources.iter().map(as_client).collect();
    let metrics = Arc::new(TimelineMetrics::new().expect("metrics"));
    let aggregator = TimelineAggregator::new(
        clients,
        TimelineCache::new(store),
        Arc::new(config),
        metrics.clone(),
        Arc::new(SystemClock),
    );
    AppState::new(aggregator, metrics)
}

fn happy_sources() -> Vec<Arc<ScriptedSource>> {
    fixtures::happy_path_events()
        .into_iter()
        .map(|(source, events)| ScriptedSource::succeeding(source, events))
        .collect()
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, body.to_vec())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("json body")
}

#[tokio::test]
async fn test_case_without_timeline_skips_sources() {
    let sources = happy_sources();
    let app = app_with(Arc::new(MemoryCacheStore::new()), &sources);

    let (status, body) = send(&app, Method::GET, "/support/cases/CASE-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "caseId": "CASE-1" }));
    assert_eq!(sources[0].calls(), 0);
}

#[tokio::test]
async fn test_case_with_timeline() {
    let sources = happy_sources();
    let app = app_with(Arc::new(MemoryCacheStore::new()), &sources);

    let (status, body) = send(&app, Method::GET, "/support/cases/CASE-1?includeTimeline=true").await;
    assert_eq!(status, StatusCode::OK);

    let body = json(&body);
    assert_eq!(body["caseId"], "CASE-1");
    assert_eq!(body["timeline"]["degraded"], false);
    assert_eq!(body["timeline"]["missingSources"], serde_json::json!([]));

    let events = body["timeline"]["events"].as_array().expect("events");
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["source"], "ORDER");
    assert_eq!(events[0]["kind"], "order.placed");
    assert_eq!(events[0]["payload"]["total"], "42.00");
    assert!(events[0]["occurredAt"].is_string());
}

#[tokio::test]
async fn test_degraded_timeline_lists_missing_sources() {
    let order = ScriptedSource::succeeding(Source::Order, vec![]);
    let payment = ScriptedSource::responding(
        Source::Payment,
        timeline_core::CollectionOutcome::UpstreamError { status: Some(503) },
    );
    let app = app_with(Arc::new(MemoryCacheStore::new()), &[order, payment]);

    let (status, body) = send(&app, Method::GET, "/support/cases/CASE-2?includeTimeline=true").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["timeline"]["degraded"], true);
    assert_eq!(body["timeline"]["missingSources"], serde_json::json!(["PAYMENT"]));
}

#[tokio::test]
async fn test_invalid_case_id_rejected() {
    let app = app_with(Arc::new(MemoryCacheStore::new()), &happy_sources());

    let (status, body) = send(&app, Method::GET, "/support/cases/bad%24id?includeTimeline=true").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_refresh_recollects() {
    let sources = happy_sources();
    let app = app_with(Arc::new(MemoryCacheStore::new()), &sources);

    send(&app, Method::GET, "/support/cases/CASE-3?includeTimeline=true").await;
    let (status, body) = send(&app, Method::POST, "/support/cases/CASE-3/timeline/refresh").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["events"].as_array().map(Vec::len), Some(3));
    assert_eq!(sources[0].calls(), 2);
}

#[tokio::test]
async fn test_delete_timeline() {
    let sources = happy_sources();
    let app = app_with(Arc::new(MemoryCacheStore::new()), &sources);

    send(&app, Method::GET, "/support/cases/CASE-4?includeTimeline=true").await;
    let (status, _) = send(&app, Method::DELETE, "/support/cases/CASE-4/timeline").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Absent entries are not an error.
    let (status, _) = send(&app, Method::DELETE, "/support/cases/CASE-4/timeline").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    send(&app, Method::GET, "/support/cases/CASE-4?includeTimeline=true").await;
    assert_eq!(sources[0].calls(), 2);
}

#[tokio::test]
async fn test_delete_with_unavailable_cache() {
    let app = app_with(Arc::new(FailingCacheStore::new()), &happy_sources());

    let (status, body) = send(&app, Method::DELETE, "/support/cases/CASE-5/timeline").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json(&body)["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_unavailable_cache_still_serves_timeline() {
    let app = app_with(Arc::new(FailingCacheStore::new()), &happy_sources());

    let (status, body) = send(&app, Method::GET, "/support/cases/CASE-6?includeTimeline=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["timeline"]["events"].as_array().map(Vec::len), Some(3));

    let (status, body) = send(&app, Method::GET, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["details"]["cache"]["backend"], "failing");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app_with(Arc::new(MemoryCacheStore::new()), &[]);

    let (status, body) = send(&app, Method::GET, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["details"]["cache"]["backend"], "memory");
    assert_eq!(body["details"]["cache"]["entries"], 0);
}

#[tokio::test]
async fn test_metrics_use_route_templates() {
    let app = app_with(Arc::new(MemoryCacheStore::new()), &happy_sources());

    send(&app, Method::GET, "/support/cases/CASE-7?includeTimeline=true").await;
    send(&app, Method::GET, "/support/cases/CASE-7?includeTimeline=true").await;

    let (status, body) = send(&app, Method::GET, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).expect("utf8");

    assert!(text.contains(r#"support_timeline_cache_events_total{event="hit"} 1"#));
    assert!(text.contains(r#"support_timeline_cache_events_total{event="miss"} 1"#));
    assert!(text.contains(r#"support_timeline_collect_seconds_count{source="remote"} 1"#));
    assert!(text.contains("/support/cases/:case_id"));
    assert!(!text.contains("CASE-7"));
}

#[tokio::test]
async fn test_openapi_document() {
    let app = app_with(Arc::new(MemoryCacheStore::new()), &[]);

    let (status, body) = send(&app, Method::GET, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    let doc = json(&body);
    assert!(doc["paths"]["/support/cases/{case_id}/timeline"].is_object());

    let occurred_at = &doc["components"]["schemas"]["TimelineEvent"]["properties"]["occurredAt"];
    assert_eq!(occurred_at["type"], "string");
    assert_eq!(occurred_at["format"], "date-time");
}

#[tokio::test]
async fn test_lmdb_backed_state_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = TimelineConfig {
        cache_backend_url: format!("lmdb://{}", dir.path().join("cache").display()),
        ..TimelineConfig::default()
    };
    let metrics = Arc::new(TimelineMetrics::new().expect("metrics"));
    let state = AppState::from_config(config, metrics.clone()).expect("state");
    assert_eq!(state.cache.backend_name(), "lmdb");

    let app = create_router(state, &ApiConfig::default());
    let (status, body) = send(&app, Method::GET, "/support/cases/CASE-8?includeTimeline=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["timeline"]["degraded"], false);

    send(&app, Method::GET, "/support/cases/CASE-8?includeTimeline=true").await;
    assert_eq!(metrics.cache_event_count(timeline_api::CacheEvent::Hit), 1);
}

#[tokio::test]
async fn test_unsupported_backend_rejected_at_startup() {
    let config = TimelineConfig {
        cache_backend_url: "redis://localhost:6379".to_string(),
        ..TimelineConfig::default()
    };
    let metrics = Arc::new(TimelineMetrics::new().expect("metrics"));
    let err = AppState::from_config(config, metrics).err().expect("rejected");
    assert_eq!(err.code, timeline_api::ErrorCode::ConfigurationError);
}

#[tokio::test(start_paused = true)]
async fn test_long_aggregation_deadline_outlives_request_timeout() {
    let config = TimelineConfig {
        per_source_timeout: std::time::Duration::from_secs(12),
        aggregation_deadline: std::time::Duration::from_secs(15),
        ..TimelineConfig::default()
    };
    assert!(config.validate().is_ok());

    let order = ScriptedSource::succeeding(
        Source::Order,
        vec![fixtures::event(Source::Order, 0, "order.placed")],
    );
    let payment = ScriptedSource::new(Source::Payment, SourceScript::Hang);
    let app = app_with_config(Arc::new(MemoryCacheStore::new()), &[order, payment], config);

    let (status, body) = send(&app, Method::GET, "/support/cases/CASE-P?includeTimeline=true").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["timeline"]["degraded"], true);
    assert_eq!(body["timeline"]["missingSources"], serde_json::json!(["PAYMENT"]));
    assert_eq!(body["timeline"]["events"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_cors_restricted_to_configured_origins() {
    let api_config = ApiConfig {
        cors_origins: vec!["https://support.example".to_string()],
        ..ApiConfig::default()
    };
    let state = state_with(Arc::new(MemoryCacheStore::new()), &[], TimelineConfig::default());
    let app = create_router(state, &api_config);

    let allow_origin_for = |origin: &'static str| {
        let app = app.clone();
        async move {
            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/health/live")
                        .header(header::ORIGIN, origin)
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .map(|v| v.to_str().expect("ascii").to_string())
        }
    };

    assert_eq!(
        allow_origin_for("https://support.example").await.as_deref(),
        Some("https://support.example")
    );
    assert_eq!(allow_origin_for("https://evil.example").await, None);
}
