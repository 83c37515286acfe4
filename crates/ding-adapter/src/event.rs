//! Inbound event normalization.
//!
//! DingTalk delivers a flat JSON object per callback. [`Event`] owns that
//! payload and exposes the canonical event fields on top of it, writing
//! back through explicit setters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::error;

use crate::error::{AdapterError, Result};
use crate::message::Message;

/// A callback body exactly as received.
pub type RawPayload = Map<String, Value>;

/// Coarse classification of the conversation an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailType {
    /// One-to-one chat (`conversationType == "1"`).
    Friend,
    /// Group chat (`conversationType == "2"`).
    Group,
    Other,
}

impl DetailType {
    pub fn from_conversation_type(code: &str) -> Self {
        match code {
            "1" => Self::Friend,
            "2" => Self::Group,
            _ => Self::Other,
        }
    }

    /// Platform code for this type. `Other` has none.
    pub fn conversation_type(&self) -> Option<&'static str> {
        match self {
            Self::Friend => Some("1"),
            Self::Group => Some("2"),
            Self::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Friend => "friend",
            Self::Group => "group",
            Self::Other => "other",
        }
    }
}

/// Sender information carried by a callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    /// Encrypted sender id.
    pub sender_id: Option<String>,
    pub sender_nick: Option<String>,
    /// Corp id of the sender, only in enterprise-internal groups.
    pub sender_corp_id: Option<String>,
    /// Staff id of the sender, only in enterprise-internal groups.
    pub sender_staff_id: Option<String>,
}

const SENDER_ID: &str = "senderId";
const SENDER_NICK: &str = "senderNick";
const SENDER_CORP_ID: &str = "senderCorpId";
const SENDER_STAFF_ID: &str = "senderStaffId";

/// A normalized DingTalk callback.
#[derive(Debug, Clone)]
pub struct Event {
    raw: RawPayload,
    msg_type: Option<String>,
    message: Option<Message>,
}

impl Event {
    /// Normalize a callback payload.
    ///
    /// Never fails: a payload without `msgtype` (or without string content
    /// under it) yields an event whose [`message`](Self::message) is `None`.
    pub fn from_raw(raw: RawPayload) -> Self {
        let msg_type = raw.get("msgtype").and_then(Value::as_str).map(str::to_owned);

        let message = match &msg_type {
            None => {
                error!("message has no msgtype");
                None
            }
            Some(kind) => {
                let content = raw
                    .get(kind.as_str())
                    .and_then(|body| body.get("content"))
                    .and_then(Value::as_str);
                if content.is_none() {
                    error!(msgtype = %kind, "message has no `{}.content`", kind);
                }
                content.map(Message::from)
            }
        };

        Self {
            raw,
            msg_type,
            message,
        }
    }

    /// Read-only view of the underlying payload.
    pub fn raw(&self) -> &RawPayload {
        &self.raw
    }

    pub fn into_raw(self) -> RawPayload {
        self.raw
    }

    /// `msgtype` of the callback.
    pub fn msg_type(&self) -> Option<&str> {
        self.msg_type.as_deref()
    }

    /// Message id (`msgId`).
    pub fn id(&self) -> Option<&str> {
        self.str_field("msgId")
    }

    /// Id of the robot that received the callback (`chatbotUserId`).
    pub fn self_id(&self) -> String {
        match self.raw.get("chatbotUserId") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Event time in seconds, from `createAt` (milliseconds).
    pub fn time(&self) -> i64 {
        self.raw.get("createAt").and_then(millis).unwrap_or(0) / 1000
    }

    /// Always `"message"`: robots only receive messages.
    pub fn event_type(&self) -> &'static str {
        "message"
    }

    pub fn detail_type(&self) -> DetailType {
        self.str_field("conversationType")
            .map(DetailType::from_conversation_type)
            .unwrap_or(DetailType::Other)
    }

    /// Write the conversation code back. `Other` leaves the payload untouched.
    pub fn set_detail_type(&mut self, value: DetailType) {
        if let Some(code) = value.conversation_type() {
            self.raw
                .insert("conversationType".to_string(), Value::from(code));
        }
    }

    pub fn sub_type(&self) -> &'static str {
        ""
    }

    /// `type.detail_type[.sub_type]`, e.g. `message.group`.
    pub fn name(&self) -> String {
        let mut name = format!("{}.{}", self.event_type(), self.detail_type().as_str());
        if !self.sub_type().is_empty() {
            name.push('.');
            name.push_str(self.sub_type());
        }
        name
    }

    pub fn user_id(&self) -> Option<&str> {
        self.str_field(SENDER_ID)
    }

    pub fn set_user_id(&mut self, value: impl Into<String>) {
        self.raw
            .insert(SENDER_ID.to_string(), Value::String(value.into()));
    }

    /// Conversation id (`conversationId`).
    pub fn group_id(&self) -> Option<&str> {
        self.str_field("conversationId")
    }

    pub fn set_group_id(&mut self, value: impl Into<String>) {
        self.raw
            .insert("conversationId".to_string(), Value::String(value.into()));
    }

    /// Conversation title, only present for group chats.
    pub fn group_title(&self) -> Option<&str> {
        self.str_field("conversationTitle")
    }

    pub fn set_group_title(&mut self, value: impl Into<String>) {
        self.raw
            .insert("conversationTitle".to_string(), Value::String(value.into()));
    }

    /// True for direct chats and for group messages that @ the robot.
    pub fn to_me(&self) -> bool {
        self.detail_type() == DetailType::Friend
            || self
                .raw
                .get("isInAtList")
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    pub fn set_to_me(&mut self, value: bool) {
        self.raw.insert("isInAtList".to_string(), Value::Bool(value));
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn set_message(&mut self, message: impl Into<Message>) {
        self.message = Some(message.into());
    }

    /// Unprocessed `content` of the callback's message body.
    pub fn raw_message(&self) -> Option<&str> {
        let kind = self.msg_type.as_deref()?;
        self.raw.get(kind)?.get("content")?.as_str()
    }

    /// Overwrite `content` in the message body. Ignored when `msgtype` is absent.
    pub fn set_raw_message(&mut self, value: impl Into<String>) {
        let Some(kind) = self.msg_type.clone() else {
            return;
        };
        let body = self
            .raw
            .entry(kind)
            .or_insert_with(|| Value::Object(Map::new()));
        if !body.is_object() {
            *body = Value::Object(Map::new());
        }
        if let Value::Object(body) = body {
            body.insert("content".to_string(), Value::String(value.into()));
        }
    }

    /// Text segments of the message, concatenated.
    pub fn plain_text(&self) -> Option<String> {
        self.message.as_ref().map(Message::extract_plain_text)
    }

    pub fn sender(&self) -> Sender {
        let field = |key: &str| self.str_field(key).map(str::to_owned);
        Sender {
            sender_id: field(SENDER_ID),
            sender_nick: field(SENDER_NICK),
            sender_corp_id: field(SENDER_CORP_ID),
            sender_staff_id: field(SENDER_STAFF_ID),
        }
    }

    /// Write back the non-empty fields of `sender`; others are left as they are.
    pub fn set_sender(&mut self, sender: &Sender) {
        let fields = [
            (SENDER_ID, &sender.sender_id),
            (SENDER_NICK, &sender.sender_nick),
            (SENDER_CORP_ID, &sender.sender_corp_id),
            (SENDER_STAFF_ID, &sender.sender_staff_id),
        ];
        for (key, value) in fields {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                self.raw
                    .insert(key.to_string(), Value::String(value.to_string()));
            }
        }
    }

    /// Quoted message of a reply. Robots do not receive quotes.
    pub fn reply(&self) -> Result<Option<&Message>> {
        Err(AdapterError::Unsupported("reply"))
    }

    /// Per-conversation URL replies are posted to.
    pub fn session_webhook(&self) -> Option<&str> {
        self.str_field("sessionWebhook")
    }

    /// When the session webhook stops accepting posts, in milliseconds.
    pub fn session_webhook_expires_at(&self) -> Option<i64> {
        self.raw.get("sessionWebhookExpiredTime").and_then(millis)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }
}

impl From<RawPayload> for Event {
    fn from(raw: RawPayload) -> Self {
        Self::from_raw(raw)
    }
}

fn millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
