use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Upper bound on a caller-supplied request id.
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    /// Reuse the caller's `x-request-id` when it is usable, otherwise mint one.
    fn from_request(request: &Request<Body>) -> Self {
        let request_id = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self { request_id }
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if status.is_success() {
        debug!(
            target = "goods::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms,
            request_id = %request_id,
            "request served"
        );
        return response;
    }

    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = chain.first().map(String::as_str).unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target = "goods::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            query = %query,
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            request_id = %request_id,
            "request failed"
        );
    } else if status.is_client_error() {
        warn!(
            target = "goods::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            query = %query,
            elapsed_ms,
            source,
            detail,
            request_id = %request_id,
            "client request error"
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/ok", get(|| async { StatusCode::NO_CONTENT }))
            .layer(from_fn(log_responses))
            .layer(from_fn(set_request_context))
    }

    #[tokio::test]
    async fn generated_request_id_is_echoed() {
        let response = app()
            .oneshot(Request::get("/ok").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        let id = response
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .expect("request id header");
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn caller_request_id_is_kept() {
        let request = Request::get("/ok")
            .header(&REQUEST_ID_HEADER, "trace-42")
            .body(Body::empty())
            .expect("request");
        let response = app().oneshot(request).await.expect("response");

        assert_eq!(
            response.headers().get(&REQUEST_ID_HEADER),
            Some(&HeaderValue::from_static("trace-42"))
        );
    }

    #[tokio::test]
    async fn oversized_request_id_is_replaced() {
        let request = Request::get("/ok")
            .header(&REQUEST_ID_HEADER, "x".repeat(MAX_REQUEST_ID_LEN + 1))
            .body(Body::empty())
            .expect("request");
        let response = app().oneshot(request).await.expect("response");

        let id = response
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .expect("request id header");
        assert!(Uuid::parse_str(id).is_ok());
    }
}
