//! HTTP callback gateway for DingTalk robots.
//!
//! Receives outgoing-robot callbacks, verifies their signatures and hands
//! each event to the echo handler, which replies through the session webhook.

mod config;
mod error;
mod handler;
mod routes;
mod state;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handler::EchoHandler;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, path = %config.callback_path, "Starting DingTalk gateway");

    // Build application state
    let handler = Arc::new(EchoHandler::new(config.echo_prefix.clone()));
    let state = AppState::new(config.adapter.clone(), handler)?;

    // Build router
    let app = routes::router(&config.callback_path).with_state(state);

    // Start server
    info!(addr = %config.addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}
