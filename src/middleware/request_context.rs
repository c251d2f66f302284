//! Per-request correlation id
//!
//! Every request gets an id (the inbound `X-Request-ID` when present, a fresh
//! uuid otherwise). It is scoped to the request's task so response envelopes
//! and log lines can read it without threading it through every call.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Correlation id of the request being served on this task, or a fresh uuid
/// outside of a request scope.
pub fn current_request_id() -> String {
    REQUEST_ID
        .try_with(|id| id.clone())
        .unwrap_or_else(|_| uuid::Uuid::new_v4().to_string())
}

pub async fn request_context_middleware(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty() && v.len() <= 128)
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    tracing::info!(request_id = %request_id, "Request started: {} {}", method, path);

    let mut response = REQUEST_ID.scope(request_id.clone(), next.run(req)).await;

    tracing::info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request finished: {} {}",
        method,
        path
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}
