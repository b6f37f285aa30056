//! Aggregation configuration
//!
//! Built once at process start and handed to the aggregator's constructor.
//! Nothing in the workspace reads these settings from a global.

use crate::{ConfigError, Source};
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_DEGRADED_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_PER_SOURCE_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_AGGREGATION_DEADLINE: Duration = Duration::from_millis(5000);
pub const DEFAULT_CACHE_BACKEND_URL: &str = "memory://";
pub const DEFAULT_UPSTREAM_PATH: &str = "/cases/{case_id}/events";

/// Placeholder substituted with the case id in [`TimelineConfig::upstream_path`].
pub const CASE_ID_PLACEHOLDER: &str = "{case_id}";

/// Settings for cache TTLs, deadlines and upstream locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineConfig {
    /// TTL for complete timelines.
    pub cache_ttl: Duration,
    /// TTL for degraded timelines, so a recovered upstream is picked up quickly.
    pub degraded_ttl: Duration,
    pub per_source_timeout: Duration,
    pub aggregation_deadline: Duration,
    /// Base URLs; `None` means the source is not registered at all.
    pub order_service_url: Option<String>,
    pub payment_service_url: Option<String>,
    pub fulfillment_service_url: Option<String>,
    pub cache_backend_url: String,
    /// Path appended to each base URL, containing `{case_id}`.
    pub upstream_path: String,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            degraded_ttl: DEFAULT_DEGRADED_TTL,
            per_source_timeout: DEFAULT_PER_SOURCE_TIMEOUT,
            aggregation_deadline: DEFAULT_AGGREGATION_DEADLINE,
            order_service_url: None,
            payment_service_url: None,
            fulfillment_service_url: None,
            cache_backend_url: DEFAULT_CACHE_BACKEND_URL.to_string(),
            upstream_path: DEFAULT_UPSTREAM_PATH.to_string(),
        }
    }
}

impl TimelineConfig {
    /// Load from process environment variables.
    ///
    /// - `TIMELINE_CACHE_TTL_SECONDS` (default 300)
    /// - `TIMELINE_DEGRADED_TTL_SECONDS` (default 30)
    /// - `TIMELINE_PER_SOURCE_TIMEOUT_MS` (default 2000)
    /// - `TIMELINE_AGGREGATION_DEADLINE_MS` (default 5000)
    /// - `ORDER_SERVICE_URL`, `PAYMENT_SERVICE_URL`, `FULFILLMENT_SERVICE_URL`
    /// - `CACHE_BACKEND_URL` (default `memory://`)
    /// - `TIMELINE_UPSTREAM_PATH` (default `/cases/{case_id}/events`)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: Duration| {
            parse_or_default(&lookup, key, default.as_secs()).map_or(default, Duration::from_secs)
        };
        let millis = |key: &str, default: Duration| {
            parse_or_default(&lookup, key, default.as_millis() as u64)
                .map_or(default, Duration::from_millis)
        };
        let url = |key: &str| {
            lookup(key)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            cache_ttl: secs("TIMELINE_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL),
            degraded_ttl: secs("TIMELINE_DEGRADED_TTL_SECONDS", DEFAULT_DEGRADED_TTL),
            per_source_timeout: millis("TIMELINE_PER_SOURCE_TIMEOUT_MS", DEFAULT_PER_SOURCE_TIMEOUT),
            aggregation_deadline: millis(
                "TIMELINE_AGGREGATION_DEADLINE_MS",
                DEFAULT_AGGREGATION_DEADLINE,
            ),
            order_service_url: url("ORDER_SERVICE_URL"),
            payment_service_url: url("PAYMENT_SERVICE_URL"),
            fulfillment_service_url: url("FULFILLMENT_SERVICE_URL"),
            cache_backend_url: lookup("CACHE_BACKEND_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_CACHE_BACKEND_URL.to_string()),
            upstream_path: lookup("TIMELINE_UPSTREAM_PATH")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_UPSTREAM_PATH.to_string()),
        }
    }

    /// Base URL for a source, if it is configured.
    pub fn source_url(&self, source: Source) -> Option<&str> {
        match source {
            Source::Order => self.order_service_url.as_deref(),
            Source::Payment => self.payment_service_url.as_deref(),
            Source::Fulfillment => self.fulfillment_service_url.as_deref(),
        }
    }

    /// Sources with a configured base URL, in precedence order.
    pub fn configured_sources(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.source_url(*s).is_some())
            .collect()
    }

    /// TTL for a timeline with the given degradation state.
    pub fn ttl_for(&self, degraded: bool) -> Duration {
        if degraded {
            self.degraded_ttl
        } else {
            self.cache_ttl
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("cache_ttl", self.cache_ttl),
            ("degraded_ttl", self.degraded_ttl),
            ("per_source_timeout", self.per_source_timeout),
            ("aggregation_deadline", self.aggregation_deadline),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: format!("{value:?}"),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.degraded_ttl > self.cache_ttl {
            return Err(ConfigError::IncompatibleOptions {
                option_a: format!("degraded_ttl={:?}", self.degraded_ttl),
                option_b: format!("cache_ttl={:?}", self.cache_ttl),
            });
        }

        if self.per_source_timeout > self.aggregation_deadline {
            return Err(ConfigError::IncompatibleOptions {
                option_a: format!("per_source_timeout={:?}", self.per_source_timeout),
                option_b: format!("aggregation_deadline={:?}", self.aggregation_deadline),
            });
        }

        for source in Source::ALL {
            if let Some(url) = self.source_url(source) {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{}_service_url", source.as_str()),
                        value: url.to_string(),
                        reason: "must start with http:// or https://".to_string(),
                    });
                }
            }
        }

        if !self.upstream_path.starts_with('/') || !self.upstream_path.contains(CASE_ID_PLACEHOLDER) {
            return Err(ConfigError::InvalidValue {
                field: "upstream_path".to_string(),
                value: self.upstream_path.clone(),
                reason: format!("must start with '/' and contain {CASE_ID_PLACEHOLDER}"),
            });
        }

        Ok(())
    }
}

fn parse_or_default<F>(lookup: &F, key: &str, default: u64) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, default, "Invalid numeric setting, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TimelineConfig::from_lookup(|_| None);
        assert_eq!(config, TimelineConfig::default());
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.degraded_ttl, Duration::from_secs(30));
        assert_eq!(config.per_source_timeout, Duration::from_millis(2000));
        assert_eq!(config.aggregation_deadline, Duration::from_millis(5000));
        assert!(config.configured_sources().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = TimelineConfig::from_lookup(lookup_from(&[
            ("TIMELINE_CACHE_TTL_SECONDS", "600"),
            ("TIMELINE_DEGRADED_TTL_SECONDS", "10"),
            ("TIMELINE_PER_SOURCE_TIMEOUT_MS", "750"),
            ("TIMELINE_AGGREGATION_DEADLINE_MS", "1500"),
            ("ORDER_SERVICE_URL", "http://orders.internal/"),
            ("FULFILLMENT_SERVICE_URL", "https://shipments.internal"),
            ("CACHE_BACKEND_URL", "lmdb:///var/lib/timeline"),
        ]));
        assert_eq!(config.cache_ttl, Duration::from_secs(600));
        assert_eq!(config.degraded_ttl, Duration::from_secs(10));
        assert_eq!(config.per_source_timeout, Duration::from_millis(750));
        assert_eq!(config.aggregation_deadline, Duration::from_millis(1500));
        assert_eq!(config.source_url(Source::Order), Some("http://orders.internal"));
        assert_eq!(config.source_url(Source::Payment), None);
        assert_eq!(
            config.configured_sources(),
            vec![Source::Order, Source::Fulfillment]
        );
        assert_eq!(config.cache_backend_url, "lmdb:///var/lib/timeline");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = TimelineConfig::from_lookup(lookup_from(&[
            ("TIMELINE_CACHE_TTL_SECONDS", "five minutes"),
            ("TIMELINE_PER_SOURCE_TIMEOUT_MS", "-3"),
        ]));
        assert_eq!(config.cache_ttl, DEFAULT_CACHE_TTL);
        assert_eq!(config.per_source_timeout, DEFAULT_PER_SOURCE_TIMEOUT);
    }

    #[test]
    fn test_ttl_for() {
        let config = TimelineConfig::default();
        assert_eq!(config.ttl_for(false), Duration::from_secs(300));
        assert_eq!(config.ttl_for(true), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_zero_ttl() {
        let config = TimelineConfig {
            cache_ttl: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "cache_ttl"
        ));
    }

    #[test]
    fn test_validate_rejects_degraded_longer_than_normal() {
        let config = TimelineConfig {
            degraded_ttl: Duration::from_secs(900),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompatibleOptions { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_source_timeout_past_deadline() {
        let config = TimelineConfig {
            per_source_timeout: Duration::from_secs(10),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let config = TimelineConfig {
            payment_service_url: Some("ftp://payments".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "payment_service_url"
        ));
    }

    #[test]
    fn test_validate_rejects_path_without_placeholder() {
        let config = TimelineConfig {
            upstream_path: "/events".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
