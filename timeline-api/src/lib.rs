//! Timeline API - Case Timeline Aggregation Service
//!
//! Serves support case views whose timelines are aggregated from the order,
//! payment and fulfillment services, cached with a TTL, and refreshable on
//! demand. Metrics are exported for Prometheus and spans over OTLP.

pub mod config;
pub mod error;
pub mod macros;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use services::{RefreshController, TimelineAggregator, TimelineOptions};
pub use state::AppState;
pub use telemetry::{CacheEvent, LatencySource, TimelineMetrics};
pub use types::{CaseQuery, CaseView};
