//! Case identity

use crate::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Longest accepted case identifier.
pub const MAX_CASE_ID_LEN: usize = 128;

/// Opaque support case identifier; the aggregation key.
///
/// A `CaseId` can only be obtained through [`CaseId::parse`], so every value in
/// circulation is already trimmed and restricted to `[A-Za-z0-9._-]`. That keeps
/// it safe to splice into cache keys and upstream URL paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "String", into = "String")]
pub struct CaseId(String);

impl CaseId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "case_id".to_string(),
            });
        }
        if trimmed.len() > MAX_CASE_ID_LEN {
            return Err(ValidationError::InvalidValue {
                field: "case_id".to_string(),
                reason: format!("must be at most {MAX_CASE_ID_LEN} characters"),
            });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(ValidationError::InvalidValue {
                field: "case_id".to_string(),
                reason: format!("unexpected character {bad:?}"),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CaseId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CaseId> for String {
    fn from(id: CaseId) -> Self {
        id.0
    }
}

impl std::str::FromStr for CaseId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id = CaseId::parse("  CASE-42 ").expect("padded id should parse");
        assert_eq!(id.as_str(), "CASE-42");
    }

    #[test]
    fn test_parse_accepts_dots_and_underscores() {
        assert!(CaseId::parse("case_1.a-b").is_ok());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            CaseId::parse("   "),
            Err(ValidationError::RequiredFieldMissing { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_path_characters() {
        for raw in ["a/b", "a b", "a?b", "../x", "ü"] {
            assert!(CaseId::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_parse_enforces_length() {
        let max = "a".repeat(MAX_CASE_ID_LEN);
        assert!(CaseId::parse(&max).is_ok());
        let over = "a".repeat(MAX_CASE_ID_LEN + 1);
        assert!(CaseId::parse(&over).is_err());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let id: CaseId = serde_json::from_str("\"abc\"").expect("valid id");
        assert_eq!(id.to_string(), "abc");
        assert!(serde_json::from_str::<CaseId>("\"a/b\"").is_err());
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"abc\"");
    }
}
