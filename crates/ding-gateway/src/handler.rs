//! Echo handler - replies to every message addressed to the bot.

use async_trait::async_trait;
use ding_adapter::error::Result;
use ding_adapter::{ApiParams, Bot, Event, EventHandler};
use tracing::{debug, info};

/// Replies with the text it received, mentioning the sender in groups.
///
/// Useful for checking the callback and reply flow without a real host.
#[derive(Debug, Clone, Default)]
pub struct EchoHandler {
    /// Optional prefix to add before the echo.
    prefix: Option<String>,
}

impl EchoHandler {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    fn reply_text(&self, text: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, text),
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl EventHandler for EchoHandler {
    async fn handle_event(&self, bot: &Bot, event: Event) -> Result<()> {
        if !event.to_me() {
            debug!(event = %event.name(), "Skipping event not addressed to the bot");
            return Ok(());
        }

        let text = event.plain_text().unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            debug!("Skipping event without text");
            return Ok(());
        }

        bot.send(&event, self.reply_text(text), true, ApiParams::default())
            .await?;
        info!(
            bot = %bot.self_id(),
            conversation = event.group_id().unwrap_or_default(),
            "Echoed message"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "EchoHandler"
    }
}
