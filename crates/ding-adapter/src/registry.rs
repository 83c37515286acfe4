//! Registry of connected bots, shared by every bot of a process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::bot::Bot;
use crate::error::{AdapterError, Result};

/// Connected bots by id.
///
/// Bots are added when their first callback arrives and removed on
/// disconnect. Lookups take a read lock only.
#[derive(Clone, Default)]
pub struct BotRegistry {
    bots: Arc<RwLock<HashMap<String, Bot>>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bot`, returning the bot previously registered under its id.
    pub async fn connect(&self, bot: Bot) -> Option<Bot> {
        let id = bot.self_id().to_string();
        let previous = self.bots.write().await.insert(id.clone(), bot);
        info!(bot = %id, "Bot connected");
        previous
    }

    pub async fn disconnect(&self, id: &str) -> Option<Bot> {
        let removed = self.bots.write().await.remove(id);
        if removed.is_some() {
            info!(bot = %id, "Bot disconnected");
        }
        removed
    }

    pub async fn lookup(&self, id: &str) -> Result<Bot> {
        self.bots
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AdapterError::BotNotFound(id.to_string()))
    }

    /// Return the bot registered as `id`, registering `create()` if there is none.
    pub async fn get_or_connect<F>(&self, id: &str, create: F) -> Result<Bot>
    where
        F: FnOnce() -> Result<Bot>,
    {
        if let Ok(bot) = self.lookup(id).await {
            return Ok(bot);
        }

        let mut bots = self.bots.write().await;
        if let Some(bot) = bots.get(id) {
            return Ok(bot.clone());
        }
        let bot = create()?;
        bots.insert(id.to_string(), bot.clone());
        info!(bot = %id, "Bot connected");
        Ok(bot)
    }

    pub async fn ids(&self) -> Vec<String> {
        self.bots.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.bots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bots.read().await.is_empty()
    }
}

impl std::fmt::Debug for BotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRegistry").finish_non_exhaustive()
    }
}
