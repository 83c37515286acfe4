//! Application state shared across handlers.

use std::sync::Arc;

use ding_adapter::{AdapterConfig, Bot, BotRegistry, CallbackAuthenticator, EventHandler};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Adapter configuration every bot is created with.
    pub config: Arc<AdapterConfig>,
    /// Callback authenticator.
    pub authenticator: Arc<CallbackAuthenticator>,
    /// Connected bots.
    pub registry: BotRegistry,
    /// Host entry point for normalized events.
    pub handler: Arc<dyn EventHandler>,
    /// HTTP client shared by all bots.
    pub http: reqwest::Client,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        config: AdapterConfig,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.api_timeout)
            .build()?;
        Ok(Self {
            authenticator: Arc::new(CallbackAuthenticator::new(config.clone())),
            config: Arc::new(config),
            registry: BotRegistry::new(),
            handler,
            http,
        })
    }

    /// Build a bot for `self_id` sharing this state's client and registry.
    pub fn new_bot(&self, self_id: &str) -> Bot {
        Bot::with_http_client(
            self_id,
            self.config.clone(),
            self.registry.clone(),
            self.http.clone(),
        )
    }
}
