//! Top-level error type for the dashboard binary.

use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::session::SessionError;

/// Anything that can end a dashboard run early.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The recommender API client could not be built.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The session task ended unexpectedly.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Reading operator input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Report the error to Sentry and the log.
    pub fn report(&self) {
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Dashboard failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wraps_source() {
        let err: AppError = SessionError::Closed.into();
        assert_eq!(err.to_string(), "Session error: session closed");

        let err: AppError =
            ConfigError::InvalidEnvVar("RECOMMENDER_API_BASE".to_string(), "bad".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid environment variable RECOMMENDER_API_BASE: bad"
        );
    }
}
