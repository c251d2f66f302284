//! Response envelope
//!
//! All JSON endpoints answer with
//! `{"status": <int>, "payload": <data>, "correlation_id": <request id>}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::middleware::current_request_id;

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: u16,
    pub payload: T,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_warning: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, payload: T) -> Self {
        Self {
            status: status.as_u16(),
            payload,
            correlation_id: current_request_id(),
            deprecation_warning: None,
        }
    }
}

/// Successful handler response wrapped in the envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn make(data: T, status: StatusCode) -> Self {
        Self { status, envelope: Envelope::new(status, data) }
    }

    pub fn ok(data: T) -> Self {
        Self::make(data, StatusCode::OK)
    }

    /// Mark the endpoint as deprecated, optionally naming the removal date
    pub fn deprecated(mut self, removal_date: Option<&str>) -> Self {
        let mut message =
            "This endpoint is deprecated and will be removed in the future.".to_string();
        if let Some(date) = removal_date {
            message.push_str(&format!(" This endpoint will be removed on {}.", date));
        }
        self.envelope.deprecation_warning = Some(message);
        self
    }

    pub fn envelope(&self) -> &Envelope<T> {
        &self.envelope
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}
