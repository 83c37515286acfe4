//! Outbound message model.
//!
//! A [`Message`] is an ordered list of [`MessageSegment`]s. Each segment
//! serializes to the webhook shape DingTalk expects for its kind, e.g.
//! `{"msgtype": "text", "text": {"content": "hi"}}`. A whole message is
//! rendered into one webhook body by [`Message::to_payload`].

use std::fmt;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AdapterError, Result};

/// Discriminator of a segment, equal to its `msgtype` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Text,
    Markdown,
    ActionCard,
    FeedCard,
    At,
    Empty,
}

impl SegmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::ActionCard => "actionCard",
            Self::FeedCard => "feedCard",
            Self::At => "at",
            Self::Empty => "empty",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a `text` segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

/// Body of a `markdown` segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownContent {
    pub title: String,
    pub text: String,
}

/// Body of an `actionCard` segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionCard {
    /// Card with one button spanning the whole card.
    Single(SingleButtonCard),
    /// Card with independently linked buttons.
    Multi(MultiButtonCard),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleButtonCard {
    pub title: String,
    pub text: String,
    pub single_title: String,
    #[serde(rename = "singleURL")]
    pub single_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiButtonCard {
    pub title: String,
    pub text: String,
    #[serde(with = "flag_string")]
    pub hide_avatar: bool,
    pub btn_orientation: BtnOrientation,
    pub btns: Vec<ActionButton>,
}

/// Layout of the buttons of a multi-button card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BtnOrientation {
    #[serde(rename = "0")]
    Vertical,
    #[default]
    #[serde(rename = "1")]
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionButton {
    pub title: String,
    #[serde(rename = "actionURL")]
    pub action_url: String,
}

impl ActionButton {
    pub fn new(title: impl Into<String>, action_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            action_url: action_url.into(),
        }
    }
}

/// Body of a `feedCard` segment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedCard {
    pub links: Vec<FeedLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedLink {
    pub title: String,
    #[serde(rename = "messageURL")]
    pub message_url: String,
    #[serde(rename = "picURL")]
    pub pic_url: String,
}

impl FeedLink {
    pub fn new(
        title: impl Into<String>,
        message_url: impl Into<String>,
        pic_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message_url: message_url.into(),
            pic_url: pic_url.into(),
        }
    }
}

/// Mentions carried by an `at` segment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtTarget {
    #[serde(default)]
    pub at_mobiles: Vec<String>,
    #[serde(default)]
    pub is_at_all: bool,
}

impl AtTarget {
    fn merge(&mut self, other: &AtTarget) {
        self.at_mobiles.extend(other.at_mobiles.iter().cloned());
        self.is_at_all |= other.is_at_all;
    }
}

/// One typed unit of outbound content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msgtype")]
pub enum MessageSegment {
    #[serde(rename = "text")]
    Text { text: TextContent },

    #[serde(rename = "markdown")]
    Markdown { markdown: MarkdownContent },

    #[serde(rename = "actionCard")]
    ActionCard {
        #[serde(rename = "actionCard")]
        action_card: ActionCard,
    },

    #[serde(rename = "feedCard")]
    FeedCard {
        #[serde(rename = "feedCard")]
        feed_card: FeedCard,
    },

    #[serde(rename = "at")]
    At { at: AtTarget },

    /// Acknowledge a callback without posting anything to the conversation.
    #[serde(rename = "empty")]
    Empty,
}

impl MessageSegment {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            text: TextContent {
                content: content.into(),
            },
        }
    }

    pub fn markdown(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Markdown {
            markdown: MarkdownContent {
                title: title.into(),
                text: text.into(),
            },
        }
    }

    /// Action card whose whole body links to `btn_url`.
    pub fn action_card_single_btn(
        title: impl Into<String>,
        text: impl Into<String>,
        btn_title: impl Into<String>,
        btn_url: impl Into<String>,
    ) -> Self {
        Self::ActionCard {
            action_card: ActionCard::Single(SingleButtonCard {
                title: title.into(),
                text: text.into(),
                single_title: btn_title.into(),
                single_url: btn_url.into(),
            }),
        }
    }

    pub fn action_card_multi_btns(
        title: impl Into<String>,
        text: impl Into<String>,
        btns: Vec<ActionButton>,
        hide_avatar: bool,
        orientation: BtnOrientation,
    ) -> Self {
        Self::ActionCard {
            action_card: ActionCard::Multi(MultiButtonCard {
                title: title.into(),
                text: text.into(),
                hide_avatar,
                btn_orientation: orientation,
                btns,
            }),
        }
    }

    pub fn feed_card(links: Vec<FeedLink>) -> Self {
        Self::FeedCard {
            feed_card: FeedCard { links },
        }
    }

    /// Mention the member registered with `mobile`.
    pub fn at(mobile: impl Into<String>) -> Self {
        Self::At {
            at: AtTarget {
                at_mobiles: vec![mobile.into()],
                is_at_all: false,
            },
        }
    }

    /// Mention everyone in the conversation.
    pub fn at_all() -> Self {
        Self::At {
            at: AtTarget {
                at_mobiles: Vec::new(),
                is_at_all: true,
            },
        }
    }

    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Text { .. } => SegmentKind::Text,
            Self::Markdown { .. } => SegmentKind::Markdown,
            Self::ActionCard { .. } => SegmentKind::ActionCard,
            Self::FeedCard { .. } => SegmentKind::FeedCard,
            Self::At { .. } => SegmentKind::At,
            Self::Empty => SegmentKind::Empty,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// Add another mobile number to an `at` segment.
    pub fn add_at_mobile(&mut self, mobile: impl Into<String>) -> Result<()> {
        self.at_target_mut()?.at_mobiles.push(mobile.into());
        Ok(())
    }

    /// Set the "mention everyone" flag of an `at` segment.
    pub fn set_at_all(&mut self, value: bool) -> Result<()> {
        self.at_target_mut()?.is_at_all = value;
        Ok(())
    }

    fn at_target_mut(&mut self) -> Result<&mut AtTarget> {
        match self {
            Self::At { at } => Ok(at),
            other => Err(AdapterError::InvalidMessage(format!(
                "{} segment cannot carry mentions",
                other.kind()
            ))),
        }
    }

    /// Webhook body for this segment alone.
    pub fn to_payload(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl fmt::Display for MessageSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { text } => f.write_str(&text.content),
            Self::Markdown { markdown } => f.write_str(&markdown.text),
            Self::ActionCard { action_card } => match action_card {
                ActionCard::Single(card) => f.write_str(&card.text),
                ActionCard::Multi(card) => f.write_str(&card.text),
            },
            Self::FeedCard { feed_card } => {
                let titles: Vec<&str> = feed_card.links.iter().map(|l| l.title.as_str()).collect();
                f.write_str(&titles.join("\n"))
            }
            Self::At { at } => {
                for (i, mobile) in at.at_mobiles.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "@{}", mobile)?;
                }
                Ok(())
            }
            Self::Empty => Ok(()),
        }
    }
}

/// An ordered sequence of segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message(Vec<MessageSegment>);

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[MessageSegment] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MessageSegment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: MessageSegment) {
        self.0.push(segment);
    }

    /// Concatenation of every `text` segment.
    pub fn extract_plain_text(&self) -> String {
        self.0
            .iter()
            .filter(|seg| seg.is_text())
            .map(|seg| seg.to_string())
            .collect()
    }

    /// Render the whole message into a single webhook body.
    ///
    /// Text segments are joined into one `text` body with mentions inlined
    /// as `@mobile`. A markdown, action card or feed card segment becomes the
    /// body on its own. Mentions are merged into a top-level `at` object,
    /// which only `text` and `markdown` bodies accept.
    pub fn to_payload(&self) -> Result<Value> {
        let mut content = String::new();
        let mut has_text = false;
        let mut at: Option<AtTarget> = None;
        let mut rich: Option<&MessageSegment> = None;

        for segment in &self.0 {
            match segment {
                MessageSegment::Text { text } => {
                    has_text = true;
                    content.push_str(&text.content);
                }
                MessageSegment::At { at: target } => {
                    content.push_str(&segment.to_string());
                    at.get_or_insert_with(AtTarget::default).merge(target);
                }
                MessageSegment::Empty => {}
                other => {
                    if let Some(first) = rich {
                        return Err(AdapterError::InvalidMessage(format!(
                            "cannot combine {} and {} in one message",
                            first.kind(),
                            other.kind()
                        )));
                    }
                    rich = Some(other);
                }
            }
        }

        let mut payload = match rich {
            Some(segment) => {
                if has_text {
                    return Err(AdapterError::InvalidMessage(format!(
                        "cannot combine text and {} in one message",
                        segment.kind()
                    )));
                }
                if at.is_some() && segment.kind() != SegmentKind::Markdown {
                    return Err(AdapterError::InvalidMessage(format!(
                        "{} does not support mentions",
                        segment.kind()
                    )));
                }
                segment.to_payload()?
            }
            None if has_text || at.is_some() => MessageSegment::text(content).to_payload()?,
            None => MessageSegment::Empty.to_payload()?,
        };

        if let (Some(at), Value::Object(map)) = (at, &mut payload) {
            map.insert("at".to_string(), serde_json::to_value(at)?);
        }

        Ok(payload)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<MessageSegment> for Message {
    fn from(segment: MessageSegment) -> Self {
        Self(vec![segment])
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        MessageSegment::text(text).into()
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        MessageSegment::text(text).into()
    }
}

impl From<Vec<MessageSegment>> for Message {
    fn from(segments: Vec<MessageSegment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<MessageSegment> for Message {
    fn from_iter<I: IntoIterator<Item = MessageSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<MessageSegment> for Message {
    fn extend<I: IntoIterator<Item = MessageSegment>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Message {
    type Item = MessageSegment;
    type IntoIter = std::vec::IntoIter<MessageSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a MessageSegment;
    type IntoIter = std::slice::Iter<'a, MessageSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: Into<Message>> Add<T> for Message {
    type Output = Message;

    fn add(mut self, rhs: T) -> Message {
        self += rhs;
        self
    }
}

impl<T: Into<Message>> AddAssign<T> for Message {
    fn add_assign(&mut self, rhs: T) {
        let rhs: Message = rhs.into();
        self.0.extend(rhs.0);
    }
}

impl<T: Into<Message>> Add<T> for MessageSegment {
    type Output = Message;

    fn add(self, rhs: T) -> Message {
        Message::from(self) + rhs
    }
}

/// `"1"`/`"0"` on the wire.
mod flag_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "1" } else { "0" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw == "1")
    }
}
