//! Webhook router and the `/callback` handler that dispatches verified event batches.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use linebot_core::{MessagingApi, PayloadError, WebhookPayload};
use linebot_ingress_common::{
    RequestId, SignatureConfig, record_event, start_ingress_span, verify_line_signature,
    with_request_id,
};
use serde::Serialize;
use tracing::Instrument;

use crate::dispatch::{DispatchError, Dispatcher};

pub const ACK_BODY: &str = "OK";

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn MessagingApi>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(api: Arc<dyn MessagingApi>, dispatcher: Dispatcher) -> Self {
        Self {
            api,
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// `POST /callback` behind signature verification, plus `GET /healthz`.
pub fn router(state: AppState, channel_secret: impl Into<String>) -> Router {
    let signature = SignatureConfig {
        channel_secret: channel_secret.into(),
    };
    Router::new()
        .route(
            "/callback",
            post(callback)
                .layer::<_, Infallible>(middleware::from_fn(verify_line_signature))
                .layer(Extension(signature)),
        )
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn(with_request_id))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn callback(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    body: Bytes,
) -> Result<&'static str, WebhookError> {
    tracing::debug!(body = %String::from_utf8_lossy(&body), "webhook request body");

    let payload = WebhookPayload::from_slice(&body)?;
    let request_id = request_id.as_ref().map(|Extension(rid)| rid.as_str());
    tracing::info!(
        request_id = request_id.unwrap_or_default(),
        events = payload.events.len(),
        "webhook batch received"
    );

    for event in &payload.events {
        let span = start_ingress_span(event, request_id);
        match state
            .dispatcher
            .dispatch(state.api.as_ref(), event)
            .instrument(span)
            .await
        {
            Ok(report) => record_event(event, report.outcome()),
            Err(err) => {
                record_event(event, "failed");
                return Err(err.into());
            }
        }
    }
    Ok(ACK_BODY)
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook body is not a valid event batch")]
    Parse(#[from] PayloadError),
    #[error("event dispatch failed")]
    Dispatch(#[from] DispatchError),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Parse(_) | WebhookError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(
            status = status.as_u16(),
            error = %format!("{:#}", anyhow::Error::new(self)),
            "webhook handling failed"
        );
        metrics::counter!("webhook_failures_total").increment(1);
        (
            status,
            Json(ErrorBody {
                error: "internal server error",
            }),
        )
            .into_response()
    }
}
