//! API call parameters and response interpretation.

use serde_json::Value;

use crate::error::{AdapterError, Result};
use crate::message::Message;

/// Name of the only API robots can call: post to a session webhook.
pub const POST_WEBHOOK: &str = "post_webhook";

/// Parameters of an API call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiParams {
    /// Bot that should perform the call, if not the one it was issued on.
    pub self_id: Option<String>,
    /// Session webhook to post to.
    pub session_webhook: Option<String>,
    /// Message to post.
    pub message: Option<Message>,
}

impl ApiParams {
    /// Params that post to `url`.
    pub fn webhook(url: impl Into<String>) -> Self {
        Self {
            session_webhook: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_self_id(mut self, self_id: impl Into<String>) -> Self {
        self.self_id = Some(self_id.into());
        self
    }

    pub fn with_session_webhook(mut self, url: impl Into<String>) -> Self {
        self.session_webhook = Some(url.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Overlay `overrides` on these params. Fields set in `overrides` win.
    pub fn merge(self, overrides: ApiParams) -> Self {
        Self {
            self_id: overrides.self_id.or(self.self_id),
            session_webhook: overrides.session_webhook.or(self.session_webhook),
            message: overrides.message.or(self.message),
        }
    }
}

/// Interpret a webhook response body.
///
/// Objects with a non-zero `errcode` become [`AdapterError::Api`]; anything
/// else is returned as is.
pub fn check_webhook_result(result: Value) -> Result<Value> {
    if let Some(code) = result.get("errcode") {
        if code.as_i64() != Some(0) {
            let message = result
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(AdapterError::Api {
                code: code.as_i64().unwrap_or(-1),
                message,
            });
        }
    }
    Ok(result)
}

/// Unwrap a `{"status", "retcode", "data"}` result envelope.
///
/// `status == "failed"` becomes [`AdapterError::ActionFailed`]; otherwise the
/// `data` field (or `null`) is returned.
pub fn handle_api_result(result: Option<Value>) -> Result<Value> {
    match result {
        Some(Value::Object(mut map)) => {
            if map.get("status").and_then(Value::as_str) == Some("failed") {
                return Err(AdapterError::ActionFailed {
                    retcode: map.get("retcode").and_then(Value::as_i64),
                });
            }
            Ok(map.remove("data").unwrap_or(Value::Null))
        }
        _ => Ok(Value::Null),
    }
}
