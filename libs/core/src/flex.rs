//! Typed subset of the Flex Message layout model.
//!
//! Only the properties the bot emits are modelled; everything optional is
//! omitted from the serialized JSON when unset.

use serde::{Deserialize, Serialize};

use crate::message::Action;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlexContainer {
    Bubble(Bubble),
}

/// Bubble container. Sections are stored as tagged components so `body` and
/// `footer` serialize with their `"type": "box"` discriminator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Bubble {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero: Option<FlexComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<FlexComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<FlexComponent>,
}

impl Bubble {
    pub fn hero(mut self, image: FlexImage) -> Self {
        self.hero = Some(FlexComponent::Image(image));
        self
    }

    pub fn body(mut self, body: FlexBox) -> Self {
        self.body = Some(FlexComponent::Box(body));
        self
    }

    pub fn footer(mut self, footer: FlexBox) -> Self {
        self.footer = Some(FlexComponent::Box(footer));
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Horizontal,
    Vertical,
    Baseline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlexBox {
    pub layout: Layout,
    pub contents: Vec<FlexComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<String>,
}

impl FlexBox {
    pub fn new(layout: Layout, contents: Vec<FlexComponent>) -> Self {
        Self {
            layout,
            contents,
            margin: None,
            spacing: None,
        }
    }

    pub fn margin(mut self, margin: impl Into<String>) -> Self {
        self.margin = Some(margin.into());
        self
    }

    pub fn spacing(mut self, spacing: impl Into<String>) -> Self {
        self.spacing = Some(spacing.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FlexComponent {
    Box(FlexBox),
    Text(FlexText),
    Image(FlexImage),
    Icon(FlexIcon),
    Button(FlexButton),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlexText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex: Option<u32>,
}

impl FlexText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = Some("bold".into());
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn margin(mut self, margin: impl Into<String>) -> Self {
        self.margin = Some(margin.into());
        self
    }

    pub fn wrap(mut self) -> Self {
        self.wrap = Some(true);
        self
    }

    pub fn flex(mut self, flex: u32) -> Self {
        self.flex = Some(flex);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlexImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlexIcon {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlexButton {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
}

impl FlexButton {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            style: None,
            position: None,
            margin: None,
        }
    }

    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn margin(mut self, margin: impl Into<String>) -> Self {
        self.margin = Some(margin.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bubble_serializes_with_type_tags_and_omits_unset_fields() {
        let bubble = FlexContainer::Bubble(
            Bubble::default()
                .hero(FlexImage {
                    url: "https://example.com/a.jpg".into(),
                    size: Some("full".into()),
                    aspect_ratio: Some("20:13".into()),
                    aspect_mode: Some("cover".into()),
                })
                .body(
                    FlexBox::new(
                        Layout::Baseline,
                        vec![
                            FlexComponent::Icon(FlexIcon {
                                url: "https://example.com/star.png".into(),
                                size: Some("sm".into()),
                            }),
                            FlexComponent::Text(FlexText::new("5.0").size("sm").flex(0)),
                        ],
                    )
                    .margin("md"),
                ),
        );
        let value = serde_json::to_value(&bubble).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "bubble",
                "hero": {
                    "type": "image",
                    "url": "https://example.com/a.jpg",
                    "size": "full",
                    "aspectRatio": "20:13",
                    "aspectMode": "cover"
                },
                "body": {
                    "type": "box",
                    "layout": "baseline",
                    "margin": "md",
                    "contents": [
                        {"type": "icon", "url": "https://example.com/star.png", "size": "sm"},
                        {"type": "text", "text": "5.0", "size": "sm", "flex": 0}
                    ]
                }
            })
        );
    }
}
