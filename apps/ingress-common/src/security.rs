use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use hmac::{Hmac, Mac, digest::InvalidLength};
use http_body_util::LengthLimitError;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";
pub const MAX_WEBHOOK_BODY: usize = 1024 * 1024;

/// Channel secret used to authenticate webhook callbacks.
#[derive(Clone)]
pub struct SignatureConfig {
    pub channel_secret: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,
    #[error("signature header is not valid base64")]
    Encoding,
    #[error("signature does not match body")]
    Mismatch,
}

/// Base64 HMAC-SHA256 of `body` keyed with the channel secret.
///
/// ```
/// use linebot_ingress_common::{sign, verify_signature};
///
/// let sig = sign("secret", b"{\"events\":[]}").unwrap();
/// assert!(verify_signature("secret", b"{\"events\":[]}", &sig).is_ok());
/// ```
pub fn sign(secret: &str, body: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(body);
    Ok(B64.encode(mac.finalize().into_bytes()))
}

/// Recomputes the body MAC and compares it against the header in constant time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), SignatureError> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(SignatureError::Missing);
    }
    let provided = B64
        .decode(signature)
        .map_err(|_| SignatureError::Encoding)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

fn exceeds_limit(err: axum::Error) -> bool {
    let inner = err.into_inner();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(inner.as_ref());
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

/// Rejects callbacks whose signature header does not match the raw body.
///
/// Expects a [`SignatureConfig`] extension; the buffered body is handed on
/// unchanged so handlers can parse exactly the bytes that were verified.
pub async fn verify_line_signature(req: Request<Body>, next: Next) -> Response {
    let Some(cfg) = req.extensions().get::<SignatureConfig>().cloned() else {
        tracing::error!("signature verification layer has no channel secret");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let (parts, body) = req.into_parts();
    let body_bytes = match to_bytes(body, MAX_WEBHOOK_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "webhook body rejected");
            let status = if exceeds_limit(err) {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            return status.into_response();
        }
    };
    let provided = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if let Err(err) = verify_signature(&cfg.channel_secret, &body_bytes, provided) {
        tracing::warn!(reason = %err, "invalid webhook signature; check the channel secret");
        metrics::counter!("webhook_signature_rejected_total").increment(1);
        return StatusCode::BAD_REQUEST.into_response();
    }

    let req = Request::from_parts(parts, Body::from(body_bytes));
    next.run(req).await
}
