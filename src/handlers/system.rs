use axum::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::utils::error::messages;
use crate::utils::{ApiError, ApiResponse};

pub const ROOT_BANNER: &str = "TextLayer Core API. Basepath /v1/";

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiIndex {
    pub api_version: String,
    pub api_description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
}

pub async fn root() -> &'static str {
    ROOT_BANNER
}

// API index
#[utoipa::path(
    get,
    path = "/v1/",
    responses(
        (status = 200, description = "API version information", body = ApiIndex)
    ),
    tag = "System"
)]
pub async fn index() -> ApiResponse<ApiIndex> {
    ApiResponse::ok(ApiIndex {
        api_version: "v1.0".to_string(),
        api_description: "TextLayer Core API".to_string(),
    })
}

// Liveness check
#[utoipa::path(
    get,
    path = "/v1/health",
    responses(
        (status = 200, description = "Service is online", body = HealthStatus)
    ),
    tag = "System"
)]
pub async fn health() -> ApiResponse<HealthStatus> {
    ApiResponse::make(HealthStatus { status: "online".to_string() }, StatusCode::OK)
}

pub async fn not_found() -> ApiError {
    ApiError::not_found(messages::NOT_FOUND)
}
