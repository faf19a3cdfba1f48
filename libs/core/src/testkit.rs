//! In-memory `MessagingApi` that records calls, for tests of code that sends.

use std::collections::BTreeSet;

use async_trait::async_trait;
use http::StatusCode;
use tokio::sync::Mutex;

use crate::client::{ApiError, ApiResponse, MessagingApi};
use crate::message::OutboundMessage;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Reply {
        reply_token: String,
        messages: Vec<OutboundMessage>,
    },
    Push {
        to: String,
        messages: Vec<OutboundMessage>,
    },
    Multicast {
        to: Vec<String>,
        messages: Vec<OutboundMessage>,
    },
}

impl ApiCall {
    pub fn op(&self) -> &'static str {
        match self {
            ApiCall::Reply { .. } => "reply",
            ApiCall::Push { .. } => "push",
            ApiCall::Multicast { .. } => "multicast",
        }
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        match self {
            ApiCall::Reply { messages, .. }
            | ApiCall::Push { messages, .. }
            | ApiCall::Multicast { messages, .. } => messages,
        }
    }
}

/// Records every call in order. Calls whose zero-based index was registered
/// with [`RecordingMessagingApi::fail_call`] are recorded and then answered
/// with a remote 500 error.
#[derive(Default)]
pub struct RecordingMessagingApi {
    calls: Mutex<Vec<ApiCall>>,
    failing: Mutex<BTreeSet<usize>>,
}

impl RecordingMessagingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_call(&self, index: usize) {
        self.failing.lock().await.insert(index);
    }

    pub async fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().await.clone()
    }

    pub async fn ops(&self) -> Vec<&'static str> {
        self.calls.lock().await.iter().map(ApiCall::op).collect()
    }

    async fn record(&self, call: ApiCall) -> Result<ApiResponse, ApiError> {
        let mut calls = self.calls.lock().await;
        let index = calls.len();
        let count = call.messages().len();
        calls.push(call);
        drop(calls);

        if self.failing.lock().await.contains(&index) {
            return Err(ApiError::Remote {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                retry_after: None,
                message: format!("injected failure for call {index}"),
            });
        }
        Ok(ApiResponse {
            request_id: Some(format!("req-{index}")),
            sent_message_ids: (0..count).map(|i| format!("{index}-{i}")).collect(),
        })
    }
}

#[async_trait]
impl MessagingApi for RecordingMessagingApi {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<ApiResponse, ApiError> {
        self.record(ApiCall::Reply {
            reply_token: reply_token.to_string(),
            messages: messages.to_vec(),
        })
        .await
    }

    async fn push(&self, to: &str, messages: &[OutboundMessage]) -> Result<ApiResponse, ApiError> {
        self.record(ApiCall::Push {
            to: to.to_string(),
            messages: messages.to_vec(),
        })
        .await
    }

    async fn multicast(
        &self,
        to: &[String],
        messages: &[OutboundMessage],
    ) -> Result<ApiResponse, ApiError> {
        self.record(ApiCall::Multicast {
            to: to.to_vec(),
            messages: messages.to_vec(),
        })
        .await
    }
}
