//! Outbound messaging API: reply, push, and multicast.

use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use metrics::counter;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::OutboundMessage;

pub const DEFAULT_API_BASE: &str = "https://api.line.me";
pub const MAX_MESSAGES_PER_CALL: usize = 5;
pub const MAX_MULTICAST_RECIPIENTS: usize = 500;

const REQUEST_ID_HEADER: &str = "x-line-request-id";
const MAX_ERROR_BODY: usize = 512;

/// Outcome of a successful send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub request_id: Option<String>,
    pub sent_message_ids: Vec<String>,
}

/// Operations of the messaging provider consumed by the bot.
///
/// Implementations perform no retries; callers decide how a failed call
/// affects the rest of their work.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<ApiResponse, ApiError>;

    async fn push(&self, to: &str, messages: &[OutboundMessage]) -> Result<ApiResponse, ApiError>;

    async fn multicast(
        &self,
        to: &[String],
        messages: &[OutboundMessage],
    ) -> Result<ApiResponse, ApiError>;
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("messaging api transport error")]
    Transport(#[source] reqwest::Error),
    #[error("messaging api remote error (status {status}, retry_after = {retry_after:?}): {message}")]
    Remote {
        status: StatusCode,
        retry_after: Option<Duration>,
        message: String,
    },
    #[error("messaging api response decode error")]
    Decode(#[source] reqwest::Error),
}

/// Checks the provider's per-call limits before anything goes on the wire.
pub fn validate_messages(messages: &[OutboundMessage]) -> Result<(), ApiError> {
    if messages.is_empty() {
        return Err(ApiError::InvalidRequest("at least one message is required"));
    }
    if messages.len() > MAX_MESSAGES_PER_CALL {
        return Err(ApiError::InvalidRequest("at most 5 messages per call"));
    }
    Ok(())
}

pub fn validate_recipients(to: &[String]) -> Result<(), ApiError> {
    if to.is_empty() {
        return Err(ApiError::InvalidRequest("multicast needs at least one recipient"));
    }
    if to.len() > MAX_MULTICAST_RECIPIENTS {
        return Err(ApiError::InvalidRequest("at most 500 multicast recipients"));
    }
    if to.iter().any(|id| id.trim().is_empty()) {
        return Err(ApiError::InvalidRequest("recipient id must not be empty"));
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: &'a [OutboundMessage],
}

#[derive(Serialize)]
struct MulticastRequest<'a> {
    to: &'a [String],
    messages: &'a [OutboundMessage],
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSendResponse {
    #[serde(default)]
    sent_messages: Vec<RawSentMessage>,
}

#[derive(Debug, Deserialize)]
struct RawSentMessage {
    id: String,
}

/// reqwest-backed client authenticated with the channel access token.
#[derive(Clone)]
pub struct HttpMessagingApi {
    client: Client,
    api_base: String,
    access_token: String,
}

impl HttpMessagingApi {
    pub fn new(client: Client, access_token: impl Into<String>, api_base: Option<String>) -> Self {
        Self {
            client,
            api_base: api_base.unwrap_or_else(|| DEFAULT_API_BASE.into()),
            access_token: access_token.into(),
        }
    }

    fn url(&self, op: &str) -> String {
        format!(
            "{}/v2/bot/message/{}",
            self.api_base.trim_end_matches('/'),
            op
        )
    }

    async fn send<B>(&self, op: &'static str, body: &B) -> Result<ApiResponse, ApiError>
    where
        B: Serialize + Sync,
    {
        let response = self
            .client
            .post(self.url(op))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                counter!("line_api_calls_total", "op" => op, "outcome" => "transport").increment(1);
                ApiError::Transport(err)
            })?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            counter!("line_api_calls_total", "op" => op, "outcome" => "remote").increment(1);
            let retry_after = retry_after(&response);
            let mut message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".into());
            truncate_utf8(&mut message, MAX_ERROR_BODY);
            tracing::warn!(
                op,
                status = %status,
                request_id = ?request_id,
                "messaging api rejected call"
            );
            return Err(ApiError::Remote {
                status,
                retry_after,
                message,
            });
        }

        let bytes = response.bytes().await.map_err(ApiError::Decode)?;
        // multicast answers with `{}` and some proxies send an empty body
        let raw: RawSendResponse = serde_json::from_slice(&bytes).unwrap_or_default();
        counter!("line_api_calls_total", "op" => op, "outcome" => "ok").increment(1);
        Ok(ApiResponse {
            request_id,
            sent_message_ids: raw.sent_messages.into_iter().map(|m| m.id).collect(),
        })
    }
}

#[async_trait]
impl MessagingApi for HttpMessagingApi {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<ApiResponse, ApiError> {
        if reply_token.is_empty() {
            return Err(ApiError::InvalidRequest("reply token must not be empty"));
        }
        validate_messages(messages)?;
        self.send(
            "reply",
            &ReplyRequest {
                reply_token,
                messages,
            },
        )
        .await
    }

    async fn push(&self, to: &str, messages: &[OutboundMessage]) -> Result<ApiResponse, ApiError> {
        if to.trim().is_empty() {
            return Err(ApiError::InvalidRequest("recipient id must not be empty"));
        }
        validate_messages(messages)?;
        self.send("push", &PushRequest { to, messages }).await
    }

    async fn multicast(
        &self,
        to: &[String],
        messages: &[OutboundMessage],
    ) -> Result<ApiResponse, ApiError> {
        validate_recipients(to)?;
        validate_messages(messages)?;
        self.send("multicast", &MulticastRequest { to, messages })
            .await
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate_utf8(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let api = HttpMessagingApi::new(
            Client::new(),
            "token",
            Some("https://api.line.me/".into()),
        );
        assert_eq!(api.url("push"), "https://api.line.me/v2/bot/message/push");
        let default = HttpMessagingApi::new(Client::new(), "token", None);
        assert_eq!(
            default.url("multicast"),
            "https://api.line.me/v2/bot/message/multicast"
        );
    }

    #[test]
    fn message_count_limits() {
        assert!(matches!(
            validate_messages(&[]),
            Err(ApiError::InvalidRequest(_))
        ));
        let six = vec![OutboundMessage::text("x"); 6];
        assert!(validate_messages(&six).is_err());
        assert!(validate_messages(&six[..5]).is_ok());
    }

    #[test]
    fn recipient_limits() {
        assert!(validate_recipients(&[]).is_err());
        assert!(validate_recipients(&["U1".into(), " ".into()]).is_err());
        let many: Vec<String> = (0..501).map(|i| format!("U{i}")).collect();
        assert!(validate_recipients(&many).is_err());
        assert!(validate_recipients(&many[..500]).is_ok());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut s = "國北教".to_string();
        truncate_utf8(&mut s, 4);
        assert_eq!(s, "國");
        let mut short = "ok".to_string();
        truncate_utf8(&mut short, 512);
        assert_eq!(short, "ok");
    }

    #[test]
    fn request_bodies_use_wire_field_names() {
        let messages = [OutboundMessage::text("hi")];
        let reply = serde_json::to_value(ReplyRequest {
            reply_token: "abc",
            messages: &messages,
        })
        .unwrap();
        assert_eq!(
            reply,
            serde_json::json!({"replyToken": "abc", "messages": [{"type": "text", "text": "hi"}]})
        );
        let to = vec!["U1".to_string(), "U2".to_string()];
        let multicast = serde_json::to_value(MulticastRequest {
            to: &to,
            messages: &messages,
        })
        .unwrap();
        assert_eq!(multicast["to"], serde_json::json!(["U1", "U2"]));
    }
}
