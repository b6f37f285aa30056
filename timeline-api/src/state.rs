//! Shared application state for Axum routers.

use std::sync::Arc;

use timeline_core::{Clock, SystemClock, TimelineConfig};
use timeline_storage::{open_cache_store, TimelineCache};

use crate::error::{ApiError, ApiResult};
use crate::services::{RefreshController, TimelineAggregator};
use crate::telemetry::TimelineMetrics;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<TimelineAggregator>,
    pub refresh: Arc<RefreshController>,
    pub metrics: Arc<TimelineMetrics>,
    /// Same cache the aggregator writes through, used by readiness checks.
    pub cache: TimelineCache,
    pub start_time: std::time::Instant,
}

crate::impl_from_ref!(Arc<TimelineAggregator>, aggregator);
crate::impl_from_ref!(Arc<RefreshController>, refresh);
crate::impl_from_ref!(Arc<TimelineMetrics>, metrics);
crate::impl_from_ref!(TimelineCache, cache);
crate::impl_from_ref!(std::time::Instant, start_time);

impl AppState {
    /// Assemble state around an already-built aggregator.
    pub fn new(aggregator: TimelineAggregator, metrics: Arc<TimelineMetrics>) -> Self {
        let cache = aggregator.cache().clone();
        let aggregator = Arc::new(aggregator);
        let refresh = Arc::new(RefreshController::new(Arc::clone(&aggregator)));

        Self {
            aggregator,
            refresh,
            metrics,
            cache,
            start_time: std::time::Instant::now(),
        }
    }

    /// Wire the production stack: validated config, the configured cache
    /// backend, one HTTP Source Client per configured upstream, and the
    /// system clock.
    pub fn from_config(config: TimelineConfig, metrics: Arc<TimelineMetrics>) -> ApiResult<Self> {
        config.validate()?;

        let store = open_cache_store(&config.cache_backend_url)?;
        let cache = TimelineCache::new(store);

        let http = timeline_sources::build_http_client(config.per_source_timeout).map_err(|e| {
            ApiError::internal_error(format!("Failed to build HTTP client: {}", e))
        })?;
        let clients = timeline_sources::build_source_clients(&config, &http);
        if clients.is_empty() {
            tracing::warn!("No upstream sources configured; timelines will always be empty");
        }

        tracing::info!(
            cache_backend = cache.backend_name(),
            sources = clients.len(),
            cache_ttl_secs = config.cache_ttl.as_secs(),
            degraded_ttl_secs = config.degraded_ttl.as_secs(),
            "Timeline aggregator configured"
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let aggregator = TimelineAggregator::new(
            clients,
            cache,
            Arc::new(config),
            Arc::clone(&metrics),
            clock,
        );

        Ok(Self::new(aggregator, metrics))
    }
}
