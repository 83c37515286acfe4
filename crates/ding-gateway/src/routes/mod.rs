//! Route handlers for the gateway.

pub mod callback;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router(callback_path: &str) -> Router<AppState> {
    Router::new()
        // DingTalk outgoing-robot callbacks
        .route(callback_path, post(callback::callback))
        // Health check
        .route("/health", get(health::health))
}
