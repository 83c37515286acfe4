//! DingTalk outgoing-robot adapter.
//!
//! This crate lets a chat-automation host talk to DingTalk robots. It covers
//! one conversation turn end to end:
//!
//! - Authenticating inbound callbacks (`timestamp` + HMAC `sign` headers)
//! - Normalizing callback payloads into [`Event`]s
//! - Composing outbound [`Message`]s from typed segments
//! - Posting replies to the conversation's session webhook
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ding_adapter::{AdapterConfig, ApiParams, Bot, BotRegistry, Event, MessageSegment};
//!
//! # async fn example(event: Event) -> Result<(), ding_adapter::AdapterError> {
//! let config = Arc::new(AdapterConfig::new("SECxxxx").with_access_token("token"));
//! let registry = BotRegistry::new();
//! let bot = Bot::new(event.self_id(), config, registry.clone())?;
//! registry.connect(bot.clone()).await;
//!
//! // Reply in the conversation, mentioning the sender
//! let reply = MessageSegment::text("Got it: ") + MessageSegment::text(event.plain_text().unwrap_or_default());
//! bot.send(&event, reply, true, ApiParams::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod bot;
pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod registry;
pub mod signature;
pub mod trait_def;

pub use api::{check_webhook_result, handle_api_result, ApiParams, POST_WEBHOOK};
pub use auth::{Authenticator, CallbackAuthenticator, ConnectionType};
pub use bot::Bot;
pub use config::{AdapterConfig, ConfigError};
pub use error::{AdapterError, NetworkError};
pub use event::{DetailType, Event, RawPayload, Sender};
pub use message::{
    ActionButton, ActionCard, AtTarget, BtnOrientation, FeedLink, Message, MessageSegment,
    SegmentKind,
};
pub use registry::BotRegistry;
pub use trait_def::{EventHandler, EventSource, MessageSink};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
