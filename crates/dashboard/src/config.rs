//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `RECOMMENDER_API_BASE` - Recommender API base URL (default: `http://localhost:5000/api`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! The recommendation count and the post-interaction refresh delay are fixed
//! by [`SessionSettings`](crate::session::SessionSettings) and are not read
//! from the environment.

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Dashboard application configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Recommender API client configuration
    pub api: ApiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "staging")
    pub sentry_environment: Option<String>,
}

/// Recommender API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to (e.g. `http://localhost:5000/api`)
    pub base_url: Url,
    /// Timeout applied to each request
    pub request_timeout: Duration,
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let api = ApiConfig {
            base_url: parse_base_url(
                "RECOMMENDER_API_BASE",
                &env.get_or_default("RECOMMENDER_API_BASE", DEFAULT_API_BASE),
            )?,
            request_timeout: REQUEST_TIMEOUT,
        };

        Ok(Self {
            api,
            sentry_dsn: env.get_optional("SENTRY_DSN"),
            sentry_environment: env.get_optional("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    /// Configuration pointing at `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("base_url", base_url)?,
            request_timeout: REQUEST_TIMEOUT,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional environment variable, treating empty values as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    /// Get an environment variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key).unwrap_or_else(|| default.to_string())
    }
}

/// Parse an API base URL, requiring an absolute http(s) URL.
fn parse_base_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be an absolute URL with a host".to_string(),
        ));
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<DashboardConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        DashboardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:5000/api");
        assert_eq!(config.api.request_timeout, Duration::from_secs(10));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("RECOMMENDER_API_BASE", "https://recs.internal:8443/api"),
            ("SENTRY_DSN", "https://key@sentry.example/1"),
        ])
        .unwrap();
        assert_eq!(config.api.base_url.port(), Some(8443));
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = load(&[("RECOMMENDER_API_BASE", ""), ("SENTRY_DSN", "")]).unwrap();
        assert_eq!(config.api.base_url.as_str(), "http://localhost:5000/api");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_session_tunables_are_not_read_from_env() {
        let mut vars: HashMap<&str, &str> = HashMap::new();
        vars.insert("RECOMMENDER_RECOMMENDATION_COUNT", "9");
        vars.insert("RECOMMENDER_REFRESH_DELAY_MS", "0");
        let seen = std::cell::RefCell::new(Vec::new());
        DashboardConfig::from_lookup(|key| {
            seen.borrow_mut().push(key.to_string());
            vars.get(key).map(|v| (*v).to_string())
        })
        .unwrap();
        let seen = seen.into_inner();
        assert!(!seen.iter().any(|k| k == "RECOMMENDER_RECOMMENDATION_COUNT"));
        assert!(!seen.iter().any(|k| k == "RECOMMENDER_REFRESH_DELAY_MS"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = load(&[("RECOMMENDER_API_BASE", "ftp://example.com/api")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "RECOMMENDER_API_BASE"));
    }

    #[test]
    fn test_base_url_must_be_http() {
        assert!(parse_base_url("X", "ftp://example.com/api").is_err());
        assert!(parse_base_url("X", "mailto:ops@example.com").is_err());
        assert!(parse_base_url("X", "not a url").is_err());
        assert!(parse_base_url("X", "http://127.0.0.1:5000/api").is_ok());
    }
}
