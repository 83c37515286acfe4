//! Inbound callback endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use ding_adapter::{AdapterError, Authenticator, ConnectionType, RawPayload};
use tracing::{debug, warn};

use crate::error::Result;
use crate::state::AppState;

/// Authenticate a callback, then handle its event in the background.
///
/// Answers as soon as the request is authenticated; the handler's reply
/// goes out through the session webhook.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let self_id = state
        .authenticator
        .check_permission(ConnectionType::Http, &headers, &body)?;

    let raw: RawPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!("Callback body is not a JSON object: {}", e);
        AdapterError::denied(400, "Body is not a JSON object")
    })?;

    let bot = state
        .registry
        .get_or_connect(&self_id, || Ok(state.new_bot(&self_id)))
        .await?;

    debug!(bot = %self_id, "Accepted callback");
    let handler = state.handler.clone();
    tokio::spawn(async move {
        bot.handle_message(raw, handler.as_ref()).await;
    });

    Ok(StatusCode::OK)
}
