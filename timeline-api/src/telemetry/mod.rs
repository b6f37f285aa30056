//! Timeline Telemetry - Observability Infrastructure
//!
//! Provides OpenTelemetry tracing and the Prometheus-backed Metrics Recorder.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, CacheEvent, LatencySource, TimelineMetrics};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, TelemetryConfig, TelemetryGuard};
