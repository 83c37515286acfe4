//! Capability traits the adapter exposes to, and consumes from, a host.

use async_trait::async_trait;
use serde_json::Value;

use crate::api::ApiParams;
use crate::bot::Bot;
use crate::error::Result;
use crate::event::{Event, RawPayload};
use crate::message::Message;

/// Turns raw callback payloads into events.
pub trait EventSource {
    fn parse_event(&self, raw: RawPayload) -> Event;
}

/// Sends messages back to the platform.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Call a platform API by name.
    async fn call_api(&self, api: &str, params: ApiParams) -> Result<Value>;

    /// Reply to the conversation `event` came from.
    ///
    /// With `at_sender`, the sender is mentioned first, unless the event is
    /// a direct chat.
    async fn send(
        &self,
        event: &Event,
        message: Message,
        at_sender: bool,
        overrides: ApiParams,
    ) -> Result<Value>;
}

/// The host's entry point for normalized events.
///
/// This trait is object-safe and can be used with `Arc<dyn EventHandler>`.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event received by `bot`.
    async fn handle_event(&self, bot: &Bot, event: Event) -> Result<()>;

    /// Get a human-readable name for this handler.
    fn name(&self) -> &str;
}
