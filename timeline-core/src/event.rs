//! Timeline events and their upstream provenance

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Upstream system an event came from.
///
/// Declaration order is the cross-source tie-break precedence used when two
/// events share an `occurredAt`: `ORDER < PAYMENT < FULFILLMENT`. The derived
/// `Ord` relies on it, so do not reorder the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    Order,
    Payment,
    Fulfillment,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Order, Source::Payment, Source::Fulfillment];

    /// Lowercase label used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Order => "order",
            Source::Payment => "payment",
            Source::Fulfillment => "fulfillment",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable fact on a case timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub source: Source,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub occurred_at: Timestamp,
    pub kind: String,
    #[serde(default)]
    pub payload: BTreeMap<String, String>,
}

impl TimelineEvent {
    pub fn new(source: Source, occurred_at: Timestamp, kind: impl Into<String>) -> Self {
        Self {
            source,
            occurred_at,
            kind: kind.into(),
            payload: BTreeMap::new(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_source_precedence() {
        assert!(Source::Order < Source::Payment);
        assert!(Source::Payment < Source::Fulfillment);
        let mut shuffled = vec![Source::Fulfillment, Source::Order, Source::Payment];
        shuffled.sort();
        assert_eq!(shuffled, Source::ALL.to_vec());
    }

    #[test]
    fn test_event_wire_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let event = TimelineEvent::new(Source::Payment, at, "captured").with_payload("amount", "12.50");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["source"], "PAYMENT");
        assert_eq!(json["occurredAt"], "2024-05-01T12:00:00Z");
        assert_eq!(json["kind"], "captured");
        assert_eq!(json["payload"]["amount"], "12.50");
    }
}
