use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;
use validator::Validate;

use crate::AppState;
use crate::middleware::Caller;
use crate::models::{TextToSqlAnswer, TextToSqlRequest};
use crate::utils::{ApiResponse, ApiResult};

// Answer a natural-language question with SQL over the local datastore
#[utoipa::path(
    post,
    path = "/v1/text-to-sql",
    request_body = TextToSqlRequest,
    responses(
        (status = 200, description = "Generated SQL, its result and a summary", body = TextToSqlAnswer),
        (status = 400, description = "Missing question"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "SQL generation or execution failed")
    ),
    security(
        ("api_key" = [])
    ),
    tag = "Text to SQL"
)]
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<TextToSqlRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<TextToSqlAnswer>> {
    let Json(mut request) = payload?;
    request.question = request.question.trim().to_string();
    request.validate()?;

    tracing::info!("Text-to-SQL question: {} (caller: {:?})", request.question, caller);

    let answer = state.text_to_sql_controller.ask(&request.question).await?;
    tracing::debug!("Text-to-SQL answered with: {}", answer.sql_query);
    Ok(ApiResponse::ok(answer))
}
