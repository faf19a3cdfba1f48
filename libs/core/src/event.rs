use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of a webhook callback: zero or more events for one bot channel.
///
/// ```
/// use linebot_core::WebhookPayload;
///
/// let payload = WebhookPayload::from_slice(br#"{"destination":"U0","events":[]}"#).unwrap();
/// assert!(payload.events.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<InboundEvent>,
}

#[derive(Debug, Error)]
#[error("malformed webhook payload")]
pub struct PayloadError(#[from] serde_json::Error);

impl WebhookPayload {
    /// Parses the raw callback body.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// One user action delivered by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EventSource>,
    /// Single-use handle for a synchronous reply; absent on events that cannot be replied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl InboundEvent {
    /// Text of a text-message event, `None` for every other event or content kind.
    pub fn text(&self) -> Option<&str> {
        match (&self.kind, &self.message) {
            (EventKind::Message, Some(MessageContent::Text { text, .. })) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.user_id.as_deref())
    }

    pub fn reply_token(&self) -> Option<&str> {
        self.reply_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Message,
    Postback,
    Follow,
    Unfollow,
    Join,
    Leave,
    MemberJoined,
    MemberLeft,
    Beacon,
    AccountLink,
    Unsend,
    VideoPlayComplete,
    #[serde(other)]
    Unknown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Postback => "postback",
            EventKind::Follow => "follow",
            EventKind::Unfollow => "unfollow",
            EventKind::Join => "join",
            EventKind::Leave => "leave",
            EventKind::MemberJoined => "memberJoined",
            EventKind::MemberLeft => "memberLeft",
            EventKind::Beacon => "beacon",
            EventKind::AccountLink => "accountLink",
            EventKind::Unsend => "unsend",
            EventKind::VideoPlayComplete => "videoPlayComplete",
            EventKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

/// Message payload of a `message` event. Only text is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        text: String,
    },
    #[serde(other)]
    Other,
}
