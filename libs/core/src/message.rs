use serde::{Deserialize, Serialize};

use crate::flex::FlexContainer;

/// Outbound message, serialized in the messaging API wire shape.
///
/// ```
/// use linebot_core::OutboundMessage;
/// use serde_json::json;
///
/// let msg = OutboundMessage::image("https://cdn.example/a.jpg", "https://cdn.example/a_s.jpg");
/// assert_eq!(
///     serde_json::to_value(&msg).unwrap(),
///     json!({
///         "type": "image",
///         "originalContentUrl": "https://cdn.example/a.jpg",
///         "previewImageUrl": "https://cdn.example/a_s.jpg"
///     })
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        original_content_url: String,
        preview_image_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Audio {
        original_content_url: String,
        /// Length in milliseconds.
        duration: u64,
    },
    #[serde(rename_all = "camelCase")]
    Video {
        original_content_url: String,
        preview_image_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Template { alt_text: String, template: Template },
    #[serde(rename_all = "camelCase")]
    Flex {
        alt_text: String,
        contents: FlexContainer,
    },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundMessage::Text { text: text.into() }
    }

    pub fn image(original: impl Into<String>, preview: impl Into<String>) -> Self {
        OutboundMessage::Image {
            original_content_url: original.into(),
            preview_image_url: preview.into(),
        }
    }

    pub fn audio(original: impl Into<String>, duration_ms: u64) -> Self {
        OutboundMessage::Audio {
            original_content_url: original.into(),
            duration: duration_ms,
        }
    }

    pub fn video(original: impl Into<String>, preview: impl Into<String>) -> Self {
        OutboundMessage::Video {
            original_content_url: original.into(),
            preview_image_url: preview.into(),
        }
    }

    pub fn template(alt_text: impl Into<String>, template: Template) -> Self {
        OutboundMessage::Template {
            alt_text: alt_text.into(),
            template,
        }
    }

    pub fn flex(alt_text: impl Into<String>, contents: FlexContainer) -> Self {
        OutboundMessage::Flex {
            alt_text: alt_text.into(),
            contents,
        }
    }

    /// Wire discriminator, used for logging and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text { .. } => "text",
            OutboundMessage::Image { .. } => "image",
            OutboundMessage::Audio { .. } => "audio",
            OutboundMessage::Video { .. } => "video",
            OutboundMessage::Template { .. } => "template",
            OutboundMessage::Flex { .. } => "flex",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Template {
    Buttons {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        text: String,
        actions: Vec<Action>,
    },
}

impl Template {
    pub fn actions(&self) -> &[Action] {
        match self {
            Template::Buttons { actions, .. } => actions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    /// Sends `text` back as if the user typed it.
    Message { label: String, text: String },
    /// Opens `uri` in the client.
    Uri { label: String, uri: String },
    /// Delivers `data` to the webhook as a postback event.
    #[serde(rename_all = "camelCase")]
    Postback {
        label: String,
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_text: Option<String>,
    },
}

impl Action {
    pub fn message(label: impl Into<String>, text: impl Into<String>) -> Self {
        Action::Message {
            label: label.into(),
            text: text.into(),
        }
    }

    pub fn uri(label: impl Into<String>, uri: impl Into<String>) -> Self {
        Action::Uri {
            label: label.into(),
            uri: uri.into(),
        }
    }

    pub fn postback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Action::Postback {
            label: label.into(),
            data: data.into(),
            display_text: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audio_and_video_use_camel_case_keys() {
        let audio = serde_json::to_value(OutboundMessage::audio("https://x/a.mp3", 60000)).unwrap();
        assert_eq!(
            audio,
            json!({"type": "audio", "originalContentUrl": "https://x/a.mp3", "duration": 60000})
        );
        let video =
            serde_json::to_value(OutboundMessage::video("https://x/v.mp4", "https://x/p.jpg"))
                .unwrap();
        assert_eq!(
            video,
            json!({
                "type": "video",
                "originalContentUrl": "https://x/v.mp4",
                "previewImageUrl": "https://x/p.jpg"
            })
        );
    }

    #[test]
    fn buttons_template_wire_shape() {
        let msg = OutboundMessage::template(
            "alt",
            Template::Buttons {
                title: Some("Menu".into()),
                text: "Pick one".into(),
                actions: vec![
                    Action::message("A", "do a"),
                    Action::uri("Site", "https://example.com"),
                    Action::postback("More", "more=1"),
                ],
            },
        );
        assert_eq!(msg.kind(), "template");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "template",
                "altText": "alt",
                "template": {
                    "type": "buttons",
                    "title": "Menu",
                    "text": "Pick one",
                    "actions": [
                        {"type": "message", "label": "A", "text": "do a"},
                        {"type": "uri", "label": "Site", "uri": "https://example.com"},
                        {"type": "postback", "label": "More", "data": "more=1"}
                    ]
                }
            })
        );
    }

    #[test]
    fn text_round_trips_through_wire_json() {
        let raw = json!({"type": "text", "text": "你說的是：hello"});
        let msg: OutboundMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg, OutboundMessage::text("你說的是：hello"));
    }
}
