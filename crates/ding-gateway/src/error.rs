//! Error types for the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ding_adapter::AdapterError;
use thiserror::Error;

/// Errors returned by gateway handlers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Adapter error, including callback authentication failures.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let GatewayError::Adapter(err) = self;
        let status = StatusCode::from_u16(err.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match err {
            AdapterError::RequestDenied { reason, .. } => reason,
            other => {
                tracing::error!("Internal error: {}", other);
                other.to_string()
            }
        };

        (status, body).into_response()
    }
}

/// Result type for gateway handlers.
pub type Result<T> = std::result::Result<T, GatewayError>;
