use axum::{
    body::Body,
    http::{HeaderValue, Request, header::HeaderName},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation id, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn with_request_id(mut req: Request<Body>, next: Next) -> Response {
    let rid = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(rid.clone()));

    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&rid) {
        res.headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, http::StatusCode, middleware, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn request_id_reaches_handler_and_response() {
        let app = Router::new()
            .route(
                "/",
                get(|Extension(rid): Extension<RequestId>| async move { rid.0 }),
            )
            .layer(middleware::from_fn(with_request_id));

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let header = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .expect("request id header");
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, header.as_bytes());
        assert!(Uuid::parse_str(&header).is_ok());
    }
}
