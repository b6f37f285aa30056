//! Timeline API Server
//!
//! Loads configuration from the environment, wires the aggregator and
//! starts the Axum HTTP server.

use std::sync::Arc;

use timeline_api::telemetry::{init_tracer, TelemetryConfig};
use timeline_api::{create_router, ApiConfig, ApiError, ApiResult, AppState, TimelineMetrics};
use timeline_core::TimelineConfig;

fn main() -> ApiResult<()> {
    // The OTLP exporter's blocking client must not be created inside the runtime.
    let telemetry = init_tracer(&TelemetryConfig::from_env()?)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve());
    drop(runtime);

    telemetry.shutdown();
    result
}

async fn serve() -> ApiResult<()> {
    let api_config = ApiConfig::from_env();
    let timeline_config = TimelineConfig::from_env();

    let metrics = Arc::new(TimelineMetrics::new()?);
    let state = AppState::from_config(timeline_config, metrics)?;
    let app = create_router(state, &api_config);

    let addr = api_config
        .bind_addr()
        .map_err(|e| ApiError::internal_error(format!("Invalid bind address: {}", e)))?;

    tracing::info!(%addr, "Starting timeline API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
