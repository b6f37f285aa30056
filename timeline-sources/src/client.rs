//! reqwest-backed Source Client.

use async_trait::async_trait;
use timeline_core::{CaseId, CollectionOutcome, Source, SourceClient, CASE_ID_PLACEHOLDER};
use tokio::time::{timeout_at, Instant};

use crate::decode::decode_events;

/// Reads one upstream's events for a case with a single GET request.
#[derive(Debug, Clone)]
pub struct HttpSourceClient {
    source: Source,
    client: reqwest::Client,
    base_url: String,
    path_template: String,
}

impl HttpSourceClient {
    pub fn new(
        source: Source,
        client: reqwest::Client,
        base_url: impl Into<String>,
        path_template: impl Into<String>,
    ) -> Self {
        Self {
            source,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path_template: path_template.into(),
        }
    }

    /// Full request URL for a case.
    pub fn url_for(&self, case_id: &CaseId) -> String {
        let path = self
            .path_template
            .replace(CASE_ID_PLACEHOLDER, case_id.as_str());
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    fn source(&self) -> Source {
        self.source
    }

    #[tracing::instrument(skip(self, case_id, deadline), fields(source = %self.source, case_id = %case_id))]
    async fn fetch(&self, case_id: &CaseId, deadline: Instant) -> CollectionOutcome {
        if deadline <= Instant::now() {
            tracing::debug!("Deadline already passed, skipping upstream call");
            return CollectionOutcome::Timeout;
        }

        let request = self.client.get(self.url_for(case_id)).send();
        let response = match timeout_at(deadline, request).await {
            Err(_) => {
                tracing::warn!("Upstream call timed out");
                return CollectionOutcome::Timeout;
            }
            Ok(Err(e)) if e.is_timeout() => {
                tracing::warn!(error = %e, "Upstream call timed out");
                return CollectionOutcome::Timeout;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Upstream call failed");
                return CollectionOutcome::UpstreamError {
                    status: e.status().map(|s| s.as_u16()),
                };
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Upstream returned error status");
            return CollectionOutcome::UpstreamError {
                status: Some(status.as_u16()),
            };
        }

        let body = match timeout_at(deadline, response.bytes()).await {
            Err(_) => {
                tracing::warn!("Upstream body read timed out");
                return CollectionOutcome::Timeout;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read upstream body");
                return CollectionOutcome::UpstreamError {
                    status: Some(status.as_u16()),
                };
            }
            Ok(Ok(body)) => body,
        };

        match decode_events(self.source, &body) {
            Ok(events) => {
                tracing::debug!(events = events.len(), "Upstream events decoded");
                CollectionOutcome::Success(events)
            }
            Err(failure) => {
                tracing::warn!(
                    body_bytes = failure.body_bytes,
                    shape = failure.shape,
                    reason = %failure.reason,
                    "Failed to decode upstream body"
                );
                CollectionOutcome::DecodeError
            }
        }
    }
}
