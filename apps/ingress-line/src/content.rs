//! Fixed reply content.

use linebot_core::{
    Action, Bubble, FlexBox, FlexButton, FlexComponent, FlexContainer, FlexIcon, FlexImage,
    FlexText, Layout, OutboundMessage, Template,
};

pub const ECHO_PREFIX: &str = "你說的是：";
pub const PUSH_TEXT: &str = "這是主動推播的文字訊息（Push Message）";
pub const MULTICAST_TEXT: &str = "這是群發訊息（Multicast Message）";
pub const AUDIO_DURATION_MS: u64 = 60_000;

const MENU_ALT_TEXT: &str = "這是樣板訊息（Buttons Template）";
const MENU_ACTIONS: [(&str, &str); 4] = [
    ("查詢天氣", "我要查天氣"),
    ("最新消息", "給我最新消息"),
    ("聯絡客服", "聯絡客服"),
    ("關於我們", "聯絡我們"),
];

const CAMPUS_ALT_TEXT: &str = "國北教介紹";
const CAMPUS_HERO_URL: &str = "https://www.overseas.edu.tw/wp-content/uploads/2020/10/%E5%9C%8B%E7%AB%8B%E8%87%BA%E5%8C%97%E6%95%99%E8%82%B2%E5%A4%A7%E5%AD%B81-1024x683.jpg";
const STAR_ICON_URL: &str =
    "https://developers-resource.landpress.line.me/fx/img/review_gold_star_28.png";
const CAMPUS_ADDRESS: &str = "106320台北市大安區和平東路二段134 號";
const CAMPUS_HOURS: &str = "星期六 休息\n星期日 休息\n星期一 09:00–17:00\n星期二 09:00–17:00\n星期三 09:00–17:00\n星期四 09:00–17:00\n星期五 09:00–17:00";
const CAMPUS_SITE: &str = "https://www.ntue.edu.tw/";

/// Buttons template listing the bot's features.
pub fn menu() -> OutboundMessage {
    let actions = MENU_ACTIONS
        .iter()
        .map(|(label, text)| Action::message(*label, *text))
        .collect();
    OutboundMessage::template(
        MENU_ALT_TEXT,
        Template::Buttons {
            title: Some("功能選單".into()),
            text: "請選擇一個功能：".into(),
            actions,
        },
    )
}

/// Flex card introducing the university.
pub fn campus_card() -> OutboundMessage {
    let mut rating: Vec<FlexComponent> = (0..5)
        .map(|_| {
            FlexComponent::Icon(FlexIcon {
                url: STAR_ICON_URL.into(),
                size: Some("sm".into()),
            })
        })
        .collect();
    rating.push(FlexComponent::Text(
        FlexText::new("5.0 (超強)")
            .size("sm")
            .color("#999999")
            .margin("md")
            .flex(0),
    ));

    let info = FlexBox::new(
        Layout::Vertical,
        vec![
            info_row(FlexText::new("地址").color("#aaaaaa").size("md"), CAMPUS_ADDRESS),
            info_row(
                FlexText::new("Time").color("#aaaaaa").size("md").flex(1),
                CAMPUS_HOURS,
            ),
        ],
    )
    .margin("lg")
    .spacing("sm");

    let body = FlexBox::new(
        Layout::Vertical,
        vec![
            FlexComponent::Text(FlexText::new("國立臺北教育大學").bold().size("xl")),
            FlexComponent::Box(FlexBox::new(Layout::Baseline, rating).margin("md")),
            FlexComponent::Box(info),
        ],
    );

    let footer = FlexBox::new(
        Layout::Horizontal,
        vec![
            FlexComponent::Button(
                FlexButton::new(Action::uri("前往校網", CAMPUS_SITE))
                    .position("relative")
                    .style("secondary")
                    .margin("md"),
            ),
            FlexComponent::Button(
                FlexButton::new(Action::postback("看數資系介紹", "我想了解數資系"))
                    .style("primary")
                    .margin("md"),
            ),
        ],
    );

    let bubble = Bubble::default()
        .hero(FlexImage {
            url: CAMPUS_HERO_URL.into(),
            size: Some("full".into()),
            aspect_ratio: Some("20:13".into()),
            aspect_mode: Some("cover".into()),
        })
        .body(body)
        .footer(footer);

    OutboundMessage::flex(CAMPUS_ALT_TEXT, FlexContainer::Bubble(bubble))
}

fn info_row(label: FlexText, value: &str) -> FlexComponent {
    FlexComponent::Box(
        FlexBox::new(
            Layout::Baseline,
            vec![
                FlexComponent::Text(label),
                FlexComponent::Text(
                    FlexText::new(value)
                        .wrap()
                        .color("#666666")
                        .size("sm")
                        .flex(5),
                ),
            ],
        )
        .spacing("sm"),
    )
}

pub fn echo(text: &str) -> OutboundMessage {
    OutboundMessage::text(format!("{ECHO_PREFIX}{text}"))
}

/// Media pushed during the fallback sequence, rooted at the static asset host.
#[derive(Debug, Clone)]
pub struct MediaSet {
    base_url: String,
}

impl MediaSet {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn asset(&self, name: &str) -> String {
        format!("{}/static/{name}", self.base_url)
    }

    pub fn image(&self) -> OutboundMessage {
        OutboundMessage::image(self.asset("sample.jpg"), self.asset("sample_preview.jpg"))
    }

    pub fn audio(&self) -> OutboundMessage {
        OutboundMessage::audio(self.asset("sample.mp3"), AUDIO_DURATION_MS)
    }

    pub fn video(&self) -> OutboundMessage {
        OutboundMessage::video(self.asset("sample.mp4"), self.asset("sample_preview.jpg"))
    }
}
