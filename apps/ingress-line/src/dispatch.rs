//! Keyword routing and delivery of replies for inbound text messages.
//!
//! Each handled event first becomes a [`DeliveryPlan`], an ordered list of
//! sends, which is then executed one step at a time against a
//! [`MessagingApi`]. A plan carries at most one reply and it is always the
//! first step, so a reply token is never consumed twice.

use std::str::FromStr;

use linebot_core::{ApiError, ApiResponse, InboundEvent, MessagingApi, OutboundMessage};
use thiserror::Error;

use crate::config::{AppConfig, ConfigError};
use crate::content::{self, MediaSet};

/// Keywords checked in order with exact equality; the first match wins.
pub const KEYWORD_ROUTES: &[(&str, Route)] = &[
    ("選單", Route::Menu),
    ("認識國北教", Route::CampusCard),
    ("NTUE", Route::CampusCard),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Menu,
    CampusCard,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Menu => "menu",
            Route::CampusCard => "campus_card",
        }
    }

    fn reply(&self) -> OutboundMessage {
        match self {
            Route::Menu => content::menu(),
            Route::CampusCard => content::campus_card(),
        }
    }
}

/// How a handled event was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handling {
    Keyword(Route),
    Fallback,
}

impl Handling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handling::Keyword(route) => route.as_str(),
            Handling::Fallback => "fallback",
        }
    }
}

/// What happens to the rest of a plan after one of its sends fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Stop at the first failure and report it.
    #[default]
    Abort,
    /// Log the failure and carry on with the remaining steps.
    BestEffort,
}

impl DeliveryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryPolicy::Abort => "abort",
            DeliveryPolicy::BestEffort => "best_effort",
        }
    }
}

impl FromStr for DeliveryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(DeliveryPolicy::Abort),
            "best_effort" | "best-effort" => Ok(DeliveryPolicy::BestEffort),
            _ => Err(ConfigError::InvalidPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Reply {
        reply_token: String,
        messages: Vec<OutboundMessage>,
    },
    /// `to` is `None` when the event named no user to push to.
    Push {
        to: Option<String>,
        messages: Vec<OutboundMessage>,
    },
    Multicast {
        to: Vec<String>,
        messages: Vec<OutboundMessage>,
    },
}

impl Delivery {
    pub fn op(&self) -> &'static str {
        match self {
            Delivery::Reply { .. } => "reply",
            Delivery::Push { .. } => "push",
            Delivery::Multicast { .. } => "multicast",
        }
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        match self {
            Delivery::Reply { messages, .. }
            | Delivery::Push { messages, .. }
            | Delivery::Multicast { messages, .. } => messages,
        }
    }

    async fn send(&self, api: &dyn MessagingApi) -> Result<ApiResponse, DeliveryError> {
        let resp = match self {
            Delivery::Reply {
                reply_token,
                messages,
            } => api.reply(reply_token, messages).await?,
            Delivery::Push { to: None, .. } => return Err(DeliveryError::NoRecipient),
            Delivery::Push {
                to: Some(to),
                messages,
            } => api.push(to, messages).await?,
            Delivery::Multicast { to, .. } if to.is_empty() => {
                return Err(DeliveryError::NoRecipient);
            }
            Delivery::Multicast { to, messages } => api.multicast(to, messages).await?,
        };
        Ok(resp)
    }
}

/// Ordered sends for one event. Only constructible starting from its reply.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryPlan {
    handling: Handling,
    steps: Vec<Delivery>,
}

impl DeliveryPlan {
    fn reply(handling: Handling, reply_token: &str, message: OutboundMessage) -> Self {
        Self {
            handling,
            steps: vec![Delivery::Reply {
                reply_token: reply_token.to_string(),
                messages: vec![message],
            }],
        }
    }

    fn then_push(mut self, to: Option<&str>, message: OutboundMessage) -> Self {
        self.steps.push(Delivery::Push {
            to: to.map(str::to_string),
            messages: vec![message],
        });
        self
    }

    fn then_multicast(mut self, to: Vec<String>, message: OutboundMessage) -> Self {
        self.steps.push(Delivery::Multicast {
            to,
            messages: vec![message],
        });
        self
    }

    pub fn handling(&self) -> Handling {
        self.handling
    }

    pub fn steps(&self) -> &[Delivery] {
        &self.steps
    }
}

/// Why a single step of a plan was not delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("event has no sender user id to send to")]
    NoRecipient,
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("text message event carries no reply token")]
    MissingReplyToken,
    #[error("{op} (step {step}) failed")]
    Delivery {
        step: usize,
        op: &'static str,
        #[source]
        source: DeliveryError,
    },
}

#[derive(Debug)]
pub struct StepFailure {
    pub step: usize,
    pub op: &'static str,
    pub error: DeliveryError,
}

/// Result of dispatching one event. `handling` is `None` for ignored events.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub handling: Option<Handling>,
    pub delivered: usize,
    pub failures: Vec<StepFailure>,
}

impl DispatchReport {
    pub fn outcome(&self) -> &'static str {
        match (self.handling, self.failures.is_empty()) {
            (None, _) => "ignored",
            (Some(_), true) => "delivered",
            (Some(_), false) => "partial",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    media: MediaSet,
    multicast_extras: Vec<String>,
    policy: DeliveryPolicy,
}

impl Dispatcher {
    pub fn new(base_url: &str, multicast_extras: Vec<String>, policy: DeliveryPolicy) -> Self {
        Self {
            media: MediaSet::new(base_url),
            multicast_extras,
            policy,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.base_url,
            config.multicast_extras.clone(),
            config.delivery_policy,
        )
    }

    pub fn route_for(text: &str) -> Option<Route> {
        KEYWORD_ROUTES
            .iter()
            .find(|(keyword, _)| *keyword == text)
            .map(|(_, route)| *route)
    }

    /// Builds the sends for `event`, or `None` when it is not a text message.
    ///
    /// The reply token is required up front. A missing sender (group or room
    /// events without `userId`) leaves the pushes unaddressed; they fail when
    /// executed, after the echo reply went out.
    pub fn plan(&self, event: &InboundEvent) -> Result<Option<DeliveryPlan>, DispatchError> {
        let Some(text) = event.text() else {
            return Ok(None);
        };
        let reply_token = event
            .reply_token()
            .ok_or(DispatchError::MissingReplyToken)?;

        if let Some(route) = Self::route_for(text) {
            return Ok(Some(DeliveryPlan::reply(
                Handling::Keyword(route),
                reply_token,
                route.reply(),
            )));
        }

        let sender = event.sender_id();
        let plan = DeliveryPlan::reply(Handling::Fallback, reply_token, content::echo(text))
            .then_push(sender, OutboundMessage::text(content::PUSH_TEXT))
            .then_push(sender, self.media.image())
            .then_push(sender, self.media.audio())
            .then_push(sender, self.media.video())
            .then_multicast(
                self.multicast_recipients(sender),
                OutboundMessage::text(content::MULTICAST_TEXT),
            );
        Ok(Some(plan))
    }

    /// Sender first, then the configured extras, without duplicates.
    fn multicast_recipients(&self, sender: Option<&str>) -> Vec<String> {
        let mut to: Vec<String> = sender.into_iter().map(str::to_string).collect();
        for extra in &self.multicast_extras {
            if !to.contains(extra) {
                to.push(extra.clone());
            }
        }
        to
    }

    pub async fn dispatch(
        &self,
        api: &dyn MessagingApi,
        event: &InboundEvent,
    ) -> Result<DispatchReport, DispatchError> {
        let Some(plan) = self.plan(event)? else {
            tracing::debug!(kind = event.kind.as_str(), "event ignored");
            return Ok(DispatchReport::default());
        };

        tracing::debug!(
            handling = plan.handling().as_str(),
            steps = plan.steps().len(),
            "delivery plan built"
        );
        let mut report = DispatchReport {
            handling: Some(plan.handling()),
            ..Default::default()
        };
        for (step, delivery) in plan.steps().iter().enumerate() {
            let op = delivery.op();
            tracing::debug!(step, op, messages = delivery.messages().len(), "sending");
            match delivery.send(api).await {
                Ok(resp) => {
                    report.delivered += 1;
                    tracing::debug!(
                        step,
                        op,
                        request_id = resp.request_id.as_deref().unwrap_or_default(),
                        "sent"
                    );
                }
                Err(source) => match self.policy {
                    DeliveryPolicy::Abort => {
                        return Err(DispatchError::Delivery { step, op, source });
                    }
                    DeliveryPolicy::BestEffort => {
                        tracing::warn!(step, op, error = %source, "send failed; continuing");
                        report.failures.push(StepFailure {
                            step,
                            op,
                            error: source,
                        });
                    }
                },
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linebot_core::WebhookPayload;
    use linebot_core::testkit::{ApiCall, RecordingMessagingApi};

    fn dispatcher(policy: DeliveryPolicy) -> Dispatcher {
        Dispatcher::new(
            "https://cdn.example.com/",
            vec!["@895ibvph".into()],
            policy,
        )
    }

    fn text_event(text: &str) -> InboundEvent {
        let body = serde_json::json!({
            "events": [{
                "type": "message",
                "replyToken": "rt-1",
                "source": {"type": "user", "userId": "U123"},
                "message": {"type": "text", "id": "1", "text": text}
            }]
        });
        let mut payload = WebhookPayload::from_slice(body.to_string().as_bytes()).unwrap();
        payload.events.remove(0)
    }

    #[test]
    fn keywords_match_exactly_and_in_order() {
        assert_eq!(Dispatcher::route_for("選單"), Some(Route::Menu));
        assert_eq!(Dispatcher::route_for("認識國北教"), Some(Route::CampusCard));
        assert_eq!(Dispatcher::route_for("NTUE"), Some(Route::CampusCard));
        assert_eq!(Dispatcher::route_for(" 選單"), None);
        assert_eq!(Dispatcher::route_for("ntue"), None);
    }

    #[test]
    fn keyword_plan_is_a_single_reply() {
        let plan = dispatcher(DeliveryPolicy::Abort)
            .plan(&text_event("選單"))
            .unwrap()
            .unwrap();
        assert_eq!(plan.handling(), Handling::Keyword(Route::Menu));
        assert_eq!(plan.steps().len(), 1);
        assert_eq!(plan.steps()[0].op(), "reply");
        assert_eq!(plan.steps()[0].messages()[0].kind(), "template");
    }

    #[test]
    fn fallback_plan_replies_once_then_pushes_and_multicasts() {
        let plan = dispatcher(DeliveryPolicy::Abort)
            .plan(&text_event("hello"))
            .unwrap()
            .unwrap();
        let ops: Vec<_> = plan.steps().iter().map(Delivery::op).collect();
        assert_eq!(ops, ["reply", "push", "push", "push", "push", "multicast"]);
        let kinds: Vec<_> = plan.steps()[1..5]
            .iter()
            .map(|d| d.messages()[0].kind())
            .collect();
        assert_eq!(kinds, ["text", "image", "audio", "video"]);
        assert_eq!(
            plan.steps()[5],
            Delivery::Multicast {
                to: vec!["U123".into(), "@895ibvph".into()],
                messages: vec![OutboundMessage::text(content::MULTICAST_TEXT)],
            }
        );
    }

    #[test]
    fn multicast_recipients_are_deduplicated() {
        let d = Dispatcher::new(
            "https://cdn.example.com",
            vec!["U123".into(), "Uextra".into(), "Uextra".into()],
            DeliveryPolicy::Abort,
        );
        assert_eq!(d.multicast_recipients(Some("U123")), vec!["U123", "Uextra"]);
        assert_eq!(d.multicast_recipients(None), vec!["U123", "Uextra"]);
    }

    #[test]
    fn non_text_events_produce_no_plan() {
        let payload = WebhookPayload::from_slice(
            br#"{"events":[
                {"type":"follow","replyToken":"rt","source":{"type":"user","userId":"U1"}},
                {"type":"message","replyToken":"rt","message":{"type":"sticker","id":"9"}}
            ]}"#,
        )
        .unwrap();
        let d = dispatcher(DeliveryPolicy::Abort);
        for event in &payload.events {
            assert!(d.plan(event).unwrap().is_none());
        }
    }

    #[test]
    fn missing_reply_token_fails_before_sending() {
        let mut event = text_event("hello");
        event.reply_token = None;
        assert!(matches!(
            dispatcher(DeliveryPolicy::Abort).plan(&event),
            Err(DispatchError::MissingReplyToken)
        ));
    }

    #[test]
    fn missing_sender_leaves_pushes_unaddressed() {
        let d = dispatcher(DeliveryPolicy::Abort);

        let mut event = text_event("hello");
        event.source = None;
        let plan = d.plan(&event).unwrap().unwrap();
        assert_eq!(plan.steps()[0].op(), "reply");
        assert!(
            plan.steps()[1..5]
                .iter()
                .all(|step| matches!(step, Delivery::Push { to: None, .. }))
        );
        assert!(matches!(
            &plan.steps()[5],
            Delivery::Multicast { to, .. } if to == &["@895ibvph".to_string()]
        ));

        let mut event = text_event("NTUE");
        event.source = None;
        assert_eq!(d.plan(&event).unwrap().unwrap().steps().len(), 1);
    }

    #[tokio::test]
    async fn abort_policy_replies_then_fails_without_sender() {
        let api = RecordingMessagingApi::new();
        let mut event = text_event("hello");
        event.source = None;

        let err = dispatcher(DeliveryPolicy::Abort)
            .dispatch(&api, &event)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Delivery {
                step: 1,
                source: DeliveryError::NoRecipient,
                ..
            }
        ));
        assert_eq!(api.ops().await, ["reply"]);
    }

    #[tokio::test]
    async fn best_effort_policy_skips_unaddressed_pushes() {
        let api = RecordingMessagingApi::new();
        let mut event = text_event("hello");
        event.source = None;

        let report = dispatcher(DeliveryPolicy::BestEffort)
            .dispatch(&api, &event)
            .await
            .unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 4);
        assert!(
            report
                .failures
                .iter()
                .all(|f| f.op == "push" && matches!(f.error, DeliveryError::NoRecipient))
        );
        assert_eq!(api.ops().await, ["reply", "multicast"]);
    }

    #[tokio::test]
    async fn abort_policy_stops_at_first_failure() {
        let api = RecordingMessagingApi::new();
        api.fail_call(2).await;

        let err = dispatcher(DeliveryPolicy::Abort)
            .dispatch(&api, &text_event("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Delivery { step: 2, op: "push", .. }));
        assert_eq!(api.ops().await, ["reply", "push", "push"]);
    }

    #[tokio::test]
    async fn best_effort_policy_attempts_every_step() {
        let api = RecordingMessagingApi::new();
        api.fail_call(0).await;
        api.fail_call(3).await;

        let report = dispatcher(DeliveryPolicy::BestEffort)
            .dispatch(&api, &text_event("hello"))
            .await
            .unwrap();
        assert_eq!(report.handling, Some(Handling::Fallback));
        assert_eq!(report.delivered, 4);
        let failed: Vec<_> = report.failures.iter().map(|f| (f.step, f.op)).collect();
        assert_eq!(failed, [(0, "reply"), (3, "push")]);
        assert_eq!(report.outcome(), "partial");
        assert_eq!(api.calls().await.len(), 6);
    }

    #[tokio::test]
    async fn ignored_event_sends_nothing() {
        let api = RecordingMessagingApi::new();
        let mut event = text_event("hello");
        event.message = None;

        let report = dispatcher(DeliveryPolicy::Abort)
            .dispatch(&api, &event)
            .await
            .unwrap();
        assert_eq!(report.outcome(), "ignored");
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn echo_reply_uses_event_reply_token() {
        let api = RecordingMessagingApi::new();
        dispatcher(DeliveryPolicy::Abort)
            .dispatch(&api, &text_event("hello"))
            .await
            .unwrap();
        assert_eq!(
            api.calls().await[0],
            ApiCall::Reply {
                reply_token: "rt-1".into(),
                messages: vec![OutboundMessage::text("你說的是：hello")],
            }
        );
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("abort".parse::<DeliveryPolicy>().unwrap(), DeliveryPolicy::Abort);
        assert_eq!(
            "Best-Effort".parse::<DeliveryPolicy>().unwrap(),
            DeliveryPolicy::BestEffort
        );
        assert!("later".parse::<DeliveryPolicy>().is_err());
    }
}
