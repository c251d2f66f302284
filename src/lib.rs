//! TextLayer Core Library
//!
//! Chat with tool calling and text-to-SQL over an embedded analytical store.

use sqlx::SqlitePool;
use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod controllers;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod triggers;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::Config;
pub use controllers::{TextToSqlController, ThreadController};
pub use handlers::build_router;
pub use services::llm::{ChatBackend, LLMClient, LLMError};
pub use services::{LLMSession, SchemaRetriever, SqlDatastore, TextToSqlService, Toolkit};

/// Application shared state
///
/// Built once at start-up; every service is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub datastore: Arc<SqlDatastore>,
    pub session: Arc<LLMSession>,
    pub retriever: Arc<SchemaRetriever>,
    pub text_to_sql_service: Arc<TextToSqlService>,

    pub thread_controller: Arc<ThreadController>,
    pub text_to_sql_controller: Arc<TextToSqlController>,
}

impl AppState {
    pub fn build(
        config: &Config,
        pool: SqlitePool,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self, anyhow::Error> {
        let datastore = Arc::new(SqlDatastore::new(pool, &config.datastore));
        let session = Arc::new(LLMSession::new(backend, &config.llm)?);
        let retriever = Arc::new(SchemaRetriever::new(Arc::clone(&session), Arc::clone(&datastore)));

        let text_to_sql_service = Arc::new(TextToSqlService::new(
            Arc::clone(&session),
            Arc::clone(&datastore),
            Arc::clone(&retriever),
            &config.datastore,
        ));

        let toolkit = Toolkit::new()
            .with_tool(Arc::new(services::llm::TextToSqlTool::new(Arc::clone(&datastore))));
        tracing::debug!("Toolkit ready: {:?}", toolkit.tool_names());

        let thread_controller = Arc::new(ThreadController::new(
            Arc::clone(&session),
            toolkit,
            Arc::clone(&retriever),
            config.datastore.schema_top_k,
        ));
        let text_to_sql_controller =
            Arc::new(TextToSqlController::new(Arc::clone(&text_to_sql_service)));

        Ok(Self {
            datastore,
            session,
            retriever,
            text_to_sql_service,
            thread_controller,
            text_to_sql_controller,
        })
    }
}
