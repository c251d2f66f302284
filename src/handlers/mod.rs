//! HTTP surface: route table, OpenAPI document and handlers.

pub mod system;
pub mod text_to_sql;
pub mod threads;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::AppState;
use crate::middleware::{self, AuthState};
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        system::index,
        system::health,
        threads::chat,
        text_to_sql::ask,
    ),
    components(
        schemas(
            system::ApiIndex,
            system::HealthStatus,
            models::Role,
            models::FunctionCall,
            models::ToolCall,
            models::ChatMessage,
            models::ChatMessageInput,
            models::ChatMessagesRequest,
            models::TextToSqlRequest,
            models::TextToSqlAnswer,
            models::TextToSqlDebug,
        )
    ),
    tags(
        (name = "System", description = "Service information"),
        (name = "Threads", description = "Chat with tool calling"),
        (name = "Text to SQL", description = "Natural-language questions over the datastore"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-api-key"))),
            );
        }
    }
}

/// Full application router with documentation, auth and request context
pub fn build_router(state: AppState, api_key: Option<String>) -> Router {
    let auth_state = AuthState::new(api_key);
    let state = Arc::new(state);

    let public_routes = Router::new()
        .route("/", get(system::root))
        .route("/v1/", get(system::index))
        .route("/v1/health", get(system::health));

    let protected_routes = Router::new()
        .route("/v1/threads/chat", post(threads::chat))
        .route("/v1/text-to-sql", post(text_to_sql::ask))
        .route("/v1/text-to-sql/", post(text_to_sql::ask))
        .with_state(state)
        .route_layer(axum_middleware::from_fn_with_state(auth_state, middleware::auth_middleware));

    Router::new()
        .merge(SwaggerUi::new("/v1/api-docs").url("/v1/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(system::not_found)
        .layer(axum_middleware::from_fn(middleware::request_context_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
