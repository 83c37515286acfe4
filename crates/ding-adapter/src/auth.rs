//! Callback authentication.

use chrono::Utc;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AdapterConfig;
use crate::error::{AdapterError, Result};
use crate::signature;

/// How the platform reaches the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// One HTTP POST per callback.
    Http,
    WebSocket,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
        }
    }
}

/// Decides whether an inbound request may be handled and by which bot.
pub trait Authenticator: Send + Sync {
    /// Authenticate a callback and return the id of the receiving bot.
    ///
    /// Rejections are [`AdapterError::RequestDenied`] carrying the HTTP status
    /// to answer with.
    fn check_permission(
        &self,
        connection: ConnectionType,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<String>;
}

/// Authenticator for DingTalk outgoing-robot callbacks.
#[derive(Debug, Clone)]
pub struct CallbackAuthenticator {
    config: AdapterConfig,
}

impl CallbackAuthenticator {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    fn check_callback_token(&self, headers: &HeaderMap) -> Result<()> {
        let Some(expected) = self.config.callback_token.as_deref() else {
            return Ok(());
        };

        let Some(provided) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            warn!("Missing Authorization Header");
            return Err(AdapterError::denied(403, "Missing Authorization Header"));
        };

        let token = provided
            .strip_prefix("Bearer ")
            .or_else(|| provided.strip_prefix("Token "))
            .or_else(|| provided.strip_prefix("token "))
            .unwrap_or(provided)
            .trim();

        if token != expected {
            warn!("Authorization Header is invalid");
            return Err(AdapterError::denied(403, "Authorization Header is invalid"));
        }
        Ok(())
    }
}

impl Authenticator for CallbackAuthenticator {
    fn check_permission(
        &self,
        connection: ConnectionType,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<String> {
        debug!(?headers, "headers");
        debug!(body = %String::from_utf8_lossy(body), "body");

        let Some(timestamp) = header_str(headers, "timestamp") else {
            warn!("Missing `timestamp` Header");
            return Err(AdapterError::denied(400, "Missing `timestamp` Header"));
        };
        let Some(sign) = header_str(headers, "sign") else {
            warn!("Missing `sign` Header");
            return Err(AdapterError::denied(400, "Missing `sign` Header"));
        };

        if !signature::verify(timestamp, sign, &self.config.secret) {
            warn!("Signature Header is invalid");
            return Err(AdapterError::denied(403, "Signature is invalid"));
        }

        if let Some(window) = self.config.timestamp_window {
            if !signature::is_fresh(timestamp, Utc::now(), window) {
                warn!(timestamp, "Timestamp is out of the allowed window");
                return Err(AdapterError::denied(
                    403,
                    "Timestamp is out of the allowed window",
                ));
            }
        }

        if connection != ConnectionType::Http {
            warn!(connection = connection.as_str(), "Unsupported connection type");
            return Err(AdapterError::denied(405, "Unsupported connection type"));
        }

        self.check_callback_token(headers)?;

        let payload: Value = serde_json::from_slice(body).map_err(|e| {
            warn!("Callback body is not JSON: {}", e);
            AdapterError::denied(400, "Body is not valid JSON")
        })?;

        match payload.get("chatbotUserId") {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            _ => {
                warn!("Missing `chatbotUserId` in body");
                Err(AdapterError::denied(400, "Missing `chatbotUserId`"))
            }
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
