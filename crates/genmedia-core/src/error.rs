//! Error types module
//!
//! All failures in the generation pipeline are unified under [`AppError`].
//! Each variant keeps its identity (and, for provider failures, a structured
//! [`UpstreamErrorKind`]) all the way to the caller, where
//! [`ErrorMetadata::client_message`] turns it into the single human-readable
//! string shown to the user.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like rate limits or cancellation
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Classification of a failed provider call.
///
/// Set by the provider from HTTP status codes and structured error bodies,
/// never by matching on message text downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamErrorKind {
    /// Credential missing, rejected, or pointing at an unknown project
    Authentication,
    /// Provider asked us to slow down (HTTP 429)
    RateLimited,
    /// Request never completed (connect, timeout, body read)
    Transport,
    /// Provider answered with something we could not interpret
    InvalidResponse,
    /// Any other error reported by the provider
    Provider,
}

impl UpstreamErrorKind {
    /// Whether a retry of the same call has a reasonable chance to succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport | Self::RateLimited)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::Transport => "transport",
            Self::InvalidResponse => "invalid_response",
            Self::Provider => "provider",
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for error reporting - defines how an error should be presented
/// at the UI boundary.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPSTREAM_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether submitting the same request again may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream error ({kind}): {message}")]
    Upstream {
        kind: UpstreamErrorKind,
        message: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Video job still pending after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("Generation was cancelled")]
    Cancelled,

    #[error("A generation run is already in progress")]
    RunInFlight,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        AppError::Upstream {
            kind,
            message: message.into(),
        }
    }

    /// Kind of the provider failure, if this is one.
    pub fn upstream_kind(&self) -> Option<UpstreamErrorKind> {
        match self {
            AppError::Upstream { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether the credential should be re-selected before trying again.
    pub fn is_authentication(&self) -> bool {
        self.upstream_kind() == Some(UpstreamErrorKind::Authentication)
    }

    /// Get the error type name for detailed error reporting
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Config(_) => "ConfigError",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Upstream { .. } => "UpstreamError",
            AppError::Decode(_) => "DecodeError",
            AppError::Fetch(_) => "FetchError",
            AppError::Timeout { .. } => "TimeoutError",
            AppError::Cancelled => "Cancelled",
            AppError::RunInFlight => "RunInFlight",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Set GEMINI_API_KEY (or API_KEY) and check the configuration"),
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the generation parameters and try again"),
            LogLevel::Debug,
        ),
        AppError::Upstream {
            kind: UpstreamErrorKind::Authentication,
            ..
        } => (
            "AUTHENTICATION_ERROR",
            false,
            Some("Select a valid API key"),
            LogLevel::Warn,
        ),
        AppError::Upstream {
            kind: UpstreamErrorKind::RateLimited,
            ..
        } => (
            "RATE_LIMITED",
            true,
            Some("Wait a minute and retry"),
            LogLevel::Warn,
        ),
        AppError::Upstream { .. } => (
            "UPSTREAM_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        AppError::Decode(_) => (
            "DECODE_ERROR",
            false,
            Some("Check the image format and try a different file"),
            LogLevel::Warn,
        ),
        AppError::Fetch(_) => (
            "FETCH_ERROR",
            true,
            Some("Retry the video generation"),
            LogLevel::Error,
        ),
        AppError::Timeout { .. } => (
            "TIMEOUT",
            true,
            Some("Raise VIDEO_POLL_MAX_ATTEMPTS or retry later"),
            LogLevel::Warn,
        ),
        AppError::Cancelled => ("CANCELLED", true, None, LogLevel::Debug),
        AppError::RunInFlight => (
            "RUN_IN_FLIGHT",
            true,
            Some("Wait for the current generation to finish"),
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            "INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Config(ref msg) => msg.clone(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Upstream {
                kind: UpstreamErrorKind::Authentication,
                ..
            } => "Your API key seems to be invalid. Please select a new API key to continue."
                .to_string(),
            AppError::Upstream { ref message, .. } => message.clone(),
            AppError::Decode(ref msg) => msg.clone(),
            AppError::Fetch(ref msg) => msg.clone(),
            AppError::Timeout { attempts } => format!(
                "Video generation did not finish after {} status checks",
                attempts
            ),
            AppError::Cancelled => "Generation cancelled".to_string(),
            AppError::RunInFlight => "A generation is already running".to_string(),
            AppError::Internal(_) => "Internal error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_authentication() {
        let err = AppError::upstream(UpstreamErrorKind::Authentication, "API key not valid");
        assert!(err.is_authentication());
        assert_eq!(err.error_code(), "AUTHENTICATION_ERROR");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("select a new API key"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_upstream_keeps_message() {
        let err = AppError::upstream(UpstreamErrorKind::Provider, "model overloaded");
        assert!(!err.is_authentication());
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::Provider));
        assert_eq!(err.error_code(), "UPSTREAM_ERROR");
        assert_eq!(err.client_message(), "model overloaded");
        assert_eq!(err.error_type(), "UpstreamError");
    }

    #[test]
    fn test_error_metadata_timeout() {
        let err = AppError::Timeout { attempts: 12 };
        assert_eq!(err.error_code(), "TIMEOUT");
        assert!(err.is_recoverable());
        assert!(err.client_message().contains("12"));
    }

    #[test]
    fn test_transient_kinds() {
        assert!(UpstreamErrorKind::Transport.is_transient());
        assert!(UpstreamErrorKind::RateLimited.is_transient());
        assert!(!UpstreamErrorKind::Authentication.is_transient());
        assert!(!UpstreamErrorKind::Provider.is_transient());
        assert!(!UpstreamErrorKind::InvalidResponse.is_transient());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::upstream(UpstreamErrorKind::RateLimited, "quota");
        assert_eq!(err.to_string(), "Upstream error (rate_limited): quota");
    }

    #[test]
    fn test_suggested_actions() {
        assert_eq!(
            AppError::InvalidInput("x".to_string()).suggested_action(),
            Some("Check the generation parameters and try again")
        );
        assert_eq!(AppError::Cancelled.suggested_action(), None);
    }
}
