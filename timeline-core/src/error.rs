//! Error types for timeline operations

use thiserror::Error;

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incompatible options: {option_a} and {option_b}")]
    IncompatibleOptions { option_a: String, option_b: String },
}

/// Cache layer errors.
///
/// None of these ever reach a timeline caller: the aggregator fails open and
/// turns every variant into a miss plus an `error` cache event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("Corrupt cache entry at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Failed to serialize cache entry: {reason}")]
    Serialization { reason: String },

    #[error("Unsupported cache backend URL: {url}")]
    UnsupportedBackend { url: String },
}

impl CacheError {
    /// Shorthand for an unreachable backend.
    pub fn unavailable(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

/// Master error type for all timeline errors.
#[derive(Debug, Clone, Error)]
pub enum TimelineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}
