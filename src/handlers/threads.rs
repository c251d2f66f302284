use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use crate::AppState;
use crate::middleware::Caller;
use crate::models::{ChatMessage, ChatMessagesRequest};
use crate::utils::{ApiError, ApiResponse, ApiResult};

// Run one chat turn over the supplied conversation
#[utoipa::path(
    post,
    path = "/v1/threads/chat",
    request_body = ChatMessagesRequest,
    responses(
        (status = 200, description = "Conversation extended with the assistant reply and tool results", body = Vec<ChatMessage>),
        (status = 400, description = "Invalid messages or the model rejected the request"),
        (status = 401, description = "Missing or invalid API key")
    ),
    security(
        ("api_key" = [])
    ),
    tag = "Threads"
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<ApiResponse<Vec<ChatMessage>>> {
    let Json(body) = payload?;

    let request: ChatMessagesRequest = serde_json::from_value(ChatMessagesRequest::clean(body))
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    request.validate()?;

    let messages = request.into_messages();
    tracing::info!("Chat request with {} messages (caller: {:?})", messages.len(), caller);

    let trace = state.thread_controller.process_chat_message(messages).await?;
    Ok(ApiResponse::ok(trace))
}
