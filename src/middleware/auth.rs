use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::utils::ApiError;
use crate::utils::error::messages;

#[derive(Clone)]
pub struct AuthState {
    /// Shared key; `None` disables the check
    pub api_key: Option<Arc<str>>,
}

impl AuthState {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from) }
    }
}

/// Identity attached to authenticated requests
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    ApiKey,
}

/// API key authentication.
/// The key is read from the `x-api-key` header, the `api_key` query parameter
/// or an `Authorization: Bearer` token, in that order.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        req.extensions_mut().insert(Caller::Anonymous);
        return Ok(next.run(req).await);
    };

    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let provided = extract_api_key(req.headers(), req.uri().query()).ok_or_else(|| {
        tracing::warn!("Missing API key for {} {}", method, path);
        ApiError::unauthorized(messages::UNAUTHORIZED)
    })?;

    if !keys_match(provided.as_bytes(), expected.as_bytes()) {
        tracing::warn!("Invalid API key for {} {}", method, path);
        return Err(ApiError::unauthorized(messages::UNAUTHORIZED));
    }

    tracing::debug!("API key accepted for {} {}", method, path);
    req.extensions_mut().insert(Caller::ApiKey);
    Ok(next.run(req).await)
}

/// Compares without short-circuiting on the first differing byte
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided.iter().zip(expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn extract_api_key(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok())
        && !key.is_empty()
    {
        return Some(key.to_string());
    }

    if let Some(key) = query.and_then(|q| {
        q.split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == "api_key")
            .map(|(_, v)| v.to_string())
    }) && !key.is_empty()
    {
        return Some(key);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().split_once(char::is_whitespace))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, t)| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
