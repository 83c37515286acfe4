//! A DingTalk robot: dispatches API calls and replies to events.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, error};

use crate::api::{check_webhook_result, ApiParams, POST_WEBHOOK};
use crate::auth::ConnectionType;
use crate::config::AdapterConfig;
use crate::error::{AdapterError, NetworkError, Result};
use crate::event::{DetailType, Event, RawPayload};
use crate::message::{Message, MessageSegment};
use crate::registry::BotRegistry;
use crate::trait_def::{EventHandler, EventSource, MessageSink};

/// One robot, identified by its `chatbotUserId`.
///
/// Cloning is cheap; clones share the HTTP client, config and registry.
#[derive(Clone)]
pub struct Bot {
    self_id: String,
    connection: ConnectionType,
    config: Arc<AdapterConfig>,
    http: Client,
    registry: BotRegistry,
}

impl Bot {
    /// Create an HTTP-callback bot with its own HTTP client.
    pub fn new(
        self_id: impl Into<String>,
        config: Arc<AdapterConfig>,
        registry: BotRegistry,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.api_timeout)
            .build()
            .map_err(NetworkError::Transport)?;
        Ok(Self::with_http_client(self_id, config, registry, http))
    }

    /// Create an HTTP-callback bot sharing an existing HTTP client.
    pub fn with_http_client(
        self_id: impl Into<String>,
        config: Arc<AdapterConfig>,
        registry: BotRegistry,
        http: Client,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            connection: ConnectionType::Http,
            config,
            http,
            registry,
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    /// Platform name.
    pub fn platform(&self) -> &'static str {
        "ding"
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn registry(&self) -> &BotRegistry {
        &self.registry
    }

    /// Normalize `raw` and pass it to `handler`.
    ///
    /// Handler failures are logged with the raw payload and never propagate.
    pub async fn handle_message(&self, raw: RawPayload, handler: &dyn EventHandler) {
        if raw.is_empty() {
            return;
        }
        debug!(bot = %self.self_id, "message: {:?}", raw);

        let event = self.parse_event(raw.clone());
        if let Err(e) = handler.handle_event(self, event).await {
            error!(
                bot = %self.self_id,
                handler = handler.name(),
                error = %e,
                "Failed to handle event. Raw: {}",
                serde_json::Value::Object(raw)
            );
        }
    }

    /// Call a platform API.
    ///
    /// When `params.self_id` names another bot, the call is performed by that
    /// bot instead.
    ///
    /// # Errors
    /// * [`AdapterError::BotNotFound`] - `self_id` names a bot that is not connected
    /// * [`AdapterError::ApiNotAvailable`] - unknown API or no session webhook
    /// * [`AdapterError::Api`] - the platform reported a non-zero `errcode`
    /// * [`AdapterError::Network`] - bad URL, transport failure, timeout or non-2xx status
    pub async fn call_api(&self, api: &str, mut params: ApiParams) -> Result<Value> {
        match params.self_id.take() {
            Some(id) if !id.is_empty() && id != self.self_id => {
                let bot = self.registry.lookup(&id).await?;
                debug!(from = %self.self_id, to = %id, "Forwarding API {}", api);
                bot.dispatch(api, params).await
            }
            _ => self.dispatch(api, params).await,
        }
    }

    async fn dispatch(&self, api: &str, params: ApiParams) -> Result<Value> {
        debug!(bot = %self.self_id, "Calling API {}", api);

        match (self.connection, api) {
            (ConnectionType::Http, POST_WEBHOOK) => self.post_webhook(params).await,
            _ => Err(AdapterError::ApiNotAvailable),
        }
    }

    async fn post_webhook(&self, params: ApiParams) -> Result<Value> {
        let target = params
            .session_webhook
            .filter(|url| !url.is_empty())
            .ok_or(AdapterError::ApiNotAvailable)?;

        let url = Url::parse(&target)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| NetworkError::InvalidUrl(target.clone()))?;

        let body = params.message.unwrap_or_default().to_payload()?;

        let mut request = self
            .http
            .post(url)
            .json(&body)
            .timeout(self.config.api_timeout);
        if let Some(token) = &self.config.access_token {
            request = request.query(&[("access_token", token)]);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::UnexpectedStatus(status.as_u16()).into());
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let result: Value = serde_json::from_slice(&bytes)?;
        check_webhook_result(result)
    }

    fn transport_error(&self, e: reqwest::Error) -> AdapterError {
        if e.is_timeout() {
            NetworkError::Timeout(self.config.api_timeout).into()
        } else if e.is_builder() {
            NetworkError::InvalidUrl(e.to_string()).into()
        } else {
            NetworkError::Transport(e).into()
        }
    }

    /// Reply to the conversation `event` came from.
    ///
    /// `message` may be plain text or a composed [`Message`]. With
    /// `at_sender`, a group reply starts with a mention of the sender and a
    /// space. Fields set in `overrides` replace the defaults derived from
    /// the event.
    pub async fn send(
        &self,
        event: &Event,
        message: impl Into<Message>,
        at_sender: bool,
        overrides: ApiParams,
    ) -> Result<Value> {
        let mut params = ApiParams {
            session_webhook: event.session_webhook().map(str::to_owned),
            ..Default::default()
        }
        .merge(overrides);
        params.message = Some(self.compose_reply(event, message, at_sender));

        self.call_api(POST_WEBHOOK, params).await
    }

    /// Build the message [`Bot::send`] posts for `event`.
    ///
    /// With `at_sender`, a group reply to a sender with a non-empty id is
    /// prefixed by a mention of that id and a single space.
    pub fn compose_reply(
        &self,
        event: &Event,
        message: impl Into<Message>,
        at_sender: bool,
    ) -> Message {
        let message = message.into();
        let mention = event
            .user_id()
            .filter(|id| !id.is_empty())
            .filter(|_| at_sender && event.detail_type() != DetailType::Friend);

        match mention {
            Some(user_id) => MessageSegment::at(user_id) + MessageSegment::text(" ") + message,
            None => message,
        }
    }
}

impl EventSource for Bot {
    fn parse_event(&self, raw: RawPayload) -> Event {
        Event::from_raw(raw)
    }
}

#[async_trait]
impl MessageSink for Bot {
    async fn call_api(&self, api: &str, params: ApiParams) -> Result<Value> {
        Bot::call_api(self, api, params).await
    }

    async fn send(
        &self,
        event: &Event,
        message: Message,
        at_sender: bool,
        overrides: ApiParams,
    ) -> Result<Value> {
        Bot::send(self, event, message, at_sender, overrides).await
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("self_id", &self.self_id)
            .field("connection", &self.connection)
            .field("config", &self.config)
            .finish()
    }
}
