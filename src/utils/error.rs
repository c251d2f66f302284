//! API error type
//!
//! Every failure that reaches a handler is converted into an `ApiError`, which
//! renders the same envelope as successful responses:
//! `{"status": <int>, "payload": <message>, "correlation_id": <uuid>}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::services::llm::LLMError;
use crate::utils::response::Envelope;

pub type ApiResult<T> = Result<T, ApiError>;

/// Canned messages for failures that must not leak internals.
pub mod messages {
    pub const BAD_REQUEST: &str = "Bad request";
    pub const UNAUTHORIZED: &str = "Unauthorized";
    pub const NOT_FOUND: &str = "Resource not found";
    pub const REQUEST_FAILED: &str = "Request failed";
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{} ({}): {}", .code, .status.as_u16(), payload_text(.payload))]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub payload: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, payload: Value::String(message.into()) }
    }

    /// Error carrying a structured payload (e.g. per-field validation messages)
    pub fn with_payload(status: StatusCode, code: &'static str, payload: Value) -> Self {
        Self { status, code, payload }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn invalid_sql(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_sql", message)
    }

    pub fn sql_safety_violation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "sql_safety_violation", message)
    }

    pub fn llm_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "llm_error", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Generic 500 without internal details
    pub fn request_failed() -> Self {
        Self::internal_error(messages::REQUEST_FAILED)
    }

    /// Message text when the payload is a plain string
    pub fn message(&self) -> String {
        payload_text(&self.payload)
    }
}

fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::info!("Request rejected: {}", self);
        }

        let body = Envelope::new(self.status, self.payload);
        (self.status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Datastore error: {}", err);
        ApiError::request_failed()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = serde_json::Map::new();
        for (field, errs) in errors.field_errors() {
            let msgs: Vec<Value> = errs
                .iter()
                .map(|e| {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code));
                    Value::String(msg)
                })
                .collect();
            fields.insert(field.to_string(), Value::Array(msgs));
        }
        for (field, kind) in errors.errors() {
            if let validator::ValidationErrorsKind::List(items) = kind {
                let mut nested = serde_json::Map::new();
                for (idx, item_errors) in items {
                    let ApiError { payload, .. } = ApiError::from((**item_errors).clone());
                    nested.insert(idx.to_string(), payload);
                }
                fields.insert(field.to_string(), Value::Object(nested));
            }
        }
        ApiError::with_payload(StatusCode::BAD_REQUEST, "validation_error", Value::Object(fields))
    }
}

impl From<LLMError> for ApiError {
    fn from(err: LLMError) -> Self {
        match &err {
            LLMError::Disabled | LLMError::NotConfigured(_) => {
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "llm_unavailable", err.to_string())
            },
            LLMError::RateLimited(_) => {
                ApiError::new(StatusCode::TOO_MANY_REQUESTS, "llm_rate_limited", err.to_string())
            },
            LLMError::Timeout(_) => {
                ApiError::new(StatusCode::GATEWAY_TIMEOUT, "llm_timeout", err.to_string())
            },
            LLMError::BadRequest(_) => ApiError::bad_request(err.to_string()),
            LLMError::InvalidModel(_) | LLMError::InvalidInput(_) => {
                ApiError::validation_error(err.to_string())
            },
            LLMError::ApiError(_) => ApiError::llm_error(err.to_string()),
            LLMError::ParseError(_) | LLMError::SerializationError(_) => {
                ApiError::internal_error(err.to_string())
            },
        }
    }
}
