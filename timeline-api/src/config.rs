//! API Configuration Module
//!
//! Bind address, CORS and request timeout for the HTTP surface. Loaded from
//! environment variables with defaults suitable for development. Aggregation
//! settings live in [`timeline_core::TimelineConfig`].

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default overall request timeout. Longer than the default aggregation
/// deadline so a slow fan-out still returns a degraded timeline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP surface configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Host to bind.
    pub bind_host: String,

    /// Port to bind.
    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Upper bound on any single request.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `TIMELINE_API_BIND`: Host to bind (default: 0.0.0.0)
    /// - `PORT` or `TIMELINE_API_PORT`: Port (default: 3000)
    /// - `TIMELINE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `TIMELINE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `TIMELINE_REQUEST_TIMEOUT_MS`: Per-request timeout (default: 10000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_host = lookup("TIMELINE_API_BIND")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.bind_host);

        let port = lookup("PORT")
            .map(|s| ("PORT", s))
            .or_else(|| lookup("TIMELINE_API_PORT").map(|s| ("TIMELINE_API_PORT", s)))
            .and_then(|(key, s)| parse_setting(key, &s))
            .unwrap_or(defaults.port);

        let cors_origins = lookup("TIMELINE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs = lookup("TIMELINE_CORS_MAX_AGE_SECS")
            .and_then(|s| parse_setting("TIMELINE_CORS_MAX_AGE_SECS", &s))
            .unwrap_or(defaults.cors_max_age_secs);

        let request_timeout = lookup("TIMELINE_REQUEST_TIMEOUT_MS")
            .and_then(|s| parse_setting::<u64>("TIMELINE_REQUEST_TIMEOUT_MS", &s))
            .filter(|ms| {
                if *ms == 0 {
                    tracing::warn!("TIMELINE_REQUEST_TIMEOUT_MS must be positive, using default");
                }
                *ms > 0
            })
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        Self {
            bind_host,
            port,
            cors_origins,
            cors_max_age_secs,
            request_timeout,
        }
    }

    /// Resolve the socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_host, self.port).parse()
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

/// Parse a numeric setting, logging and discarding values that do not parse.
fn parse_setting<T>(key: &str, raw: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "Invalid setting, using default");
            None
        }
    }
}
