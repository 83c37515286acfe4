//! Error types for ding-adapter.

use std::time::Duration;

use thiserror::Error;

/// Transport-level failures of an outbound webhook call.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The session webhook is not a usable URL.
    #[error("API root url invalid: {0}")]
    InvalidUrl(String),

    /// The HTTP exchange itself failed.
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The platform answered with a non-2xx status.
    #[error("HTTP request received unexpected status code: {0}")]
    UnexpectedStatus(u16),

    /// The call did not complete within the configured API timeout.
    #[error("HTTP request timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors that can occur when talking to DingTalk.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Inbound callback failed authentication.
    #[error("request denied ({status}): {reason}")]
    RequestDenied { status: u16, reason: String },

    /// The requested API does not exist or lacks a required parameter.
    #[error("API not available")]
    ApiNotAvailable,

    /// The platform accepted the request but reported a failure.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// A result envelope carried `status: failed`.
    #[error("action failed (retcode {retcode:?})")]
    ActionFailed { retcode: Option<i64> },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// No bot with this id is connected.
    #[error("bot {0} is not connected")]
    BotNotFound(String),

    /// The platform does not offer this feature.
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// The message cannot be rendered into a single webhook body.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdapterError {
    /// Build a `RequestDenied` error.
    pub fn denied(status: u16, reason: impl Into<String>) -> Self {
        Self::RequestDenied {
            status,
            reason: reason.into(),
        }
    }

    /// HTTP status an inbound handler should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RequestDenied { status, .. } => *status,
            _ => 500,
        }
    }
}

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_status_code() {
        let err = AdapterError::denied(403, "Signature is invalid");
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_string(), "request denied (403): Signature is invalid");
    }

    #[test]
    fn test_other_errors_are_internal() {
        assert_eq!(AdapterError::ApiNotAvailable.status_code(), 500);
        let err: AdapterError = NetworkError::UnexpectedStatus(502).into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("502"));
    }
}
