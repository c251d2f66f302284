// Common test utilities and helpers

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use crate::config::Config;
use crate::services::llm::ChatBackend;
use crate::services::llm::testing::ScriptedBackend;
use crate::{AppState, build_router};

/// In-memory datastore with a small product catalogue
pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    for statement in [
        "CREATE TABLE product (Key INTEGER PRIMARY KEY, Name TEXT NOT NULL, \"Product Line\" TEXT, Price REAL)",
        "INSERT INTO product VALUES (1, 'Widget', 'Tools', 9.5), (2, 'Gadget', 'Tools', 12.25), (3, 'Gizmo', 'Toys', 4.0)",
        "CREATE TABLE customer (Key INTEGER PRIMARY KEY, Name TEXT NOT NULL)",
        "INSERT INTO customer VALUES (1, 'Ada'), (2, 'Grace')",
    ] {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Failed to seed test database");
    }

    pool
}

pub fn test_config(api_key: Option<&str>) -> Config {
    let mut config = Config::default();
    config.datastore.url = "sqlite::memory:".to_string();
    config.auth.api_key = api_key.map(str::to_string);
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub backend: Arc<ScriptedBackend>,
}

pub async fn test_app(api_key: Option<&str>) -> TestApp {
    test_app_with(ScriptedBackend::new(), api_key).await
}

pub async fn test_app_with(backend: ScriptedBackend, api_key: Option<&str>) -> TestApp {
    let config = test_config(api_key);
    let backend = Arc::new(backend);
    let state = AppState::build(
        &config,
        create_test_db().await,
        Arc::clone(&backend) as Arc<dyn ChatBackend>,
    )
    .expect("Failed to build app state");
    let router = build_router(state.clone(), config.auth.api_key.clone());
    TestApp { router, state, backend }
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Send a request and decode the body as JSON (`Value::Null` when it is not JSON)
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send_raw(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub async fn send_raw(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}
