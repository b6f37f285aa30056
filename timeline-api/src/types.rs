//! Request and response types for the case endpoints.

use serde::{Deserialize, Serialize};
use timeline_core::{CaseId, Timeline};

/// Query parameters for `GET /support/cases/{case_id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[serde(rename_all = "camelCase")]
pub struct CaseQuery {
    /// Attach the aggregated timeline to the response.
    #[serde(default)]
    pub include_timeline: bool,
}

/// A support case as returned to agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CaseView {
    pub case_id: CaseId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
}
