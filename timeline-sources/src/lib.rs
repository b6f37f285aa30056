//! Timeline Sources - HTTP Source Clients
//!
//! One [`HttpSourceClient`] per configured upstream (order, payment,
//! fulfillment). Each performs exactly one GET per aggregation run, bounded by
//! the deadline the aggregator passes in, and reports failures as
//! [`CollectionOutcome`](timeline_core::CollectionOutcome) data.

mod client;
pub mod decode;

use std::sync::Arc;
use std::time::Duration;

use timeline_core::{SourceClient, TimelineConfig};

pub use client::HttpSourceClient;
pub use decode::{decode_events, parse_timestamp, DecodeFailure};

/// Errors building the shared HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum SourceSetupError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Build the HTTP client shared by every Source Client.
///
/// No overall request timeout is set here; each call is bounded by its own
/// deadline. Connecting is capped at the per-source timeout.
pub fn build_http_client(connect_timeout: Duration) -> Result<reqwest::Client, SourceSetupError> {
    let client = reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(concat!("timeline-sources/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// One client per source with a configured base URL, in precedence order.
/// Unconfigured sources are simply not registered.
pub fn build_source_clients(
    config: &TimelineConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn SourceClient>> {
    config
        .configured_sources()
        .into_iter()
        .filter_map(|source| {
            let base_url = config.source_url(source)?;
            tracing::info!(source = %source, base_url, "Registered upstream source");
            let client: Arc<dyn SourceClient> = Arc::new(HttpSourceClient::new(
                source,
                client.clone(),
                base_url,
                config.upstream_path.clone(),
            ));
            Some(client)
        })
        .collect()
}
