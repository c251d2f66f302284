use axum::http::StatusCode;
use serde_json::json;

use super::common::{post_json, send, test_app, test_app_with};
use crate::services::llm::testing::{ScriptedBackend, vector};
use crate::services::llm::{ChatCompletion, LLMError};

const PRICIEST_SQL: &str = "SELECT Name FROM product ORDER BY Price DESC LIMIT 1";

fn sql_answer(sql: &str, summary: &str) -> ChatCompletion {
    ChatCompletion::text(format!("```sql\n{}\n```\n{}", sql, summary))
}

#[tokio::test]
async fn judge_summary_wins_over_draft() {
    let app = test_app(None).await;
    app.backend.push_chat(sql_answer(PRICIEST_SQL, "Gadget is the priciest."));
    app.backend.push_chat(ChatCompletion::text("Gadget costs the most."));

    let answer = app.state.text_to_sql_service.answer("Which product costs the most?").await.unwrap();

    assert_eq!(answer.sql_query, PRICIEST_SQL);
    assert_eq!(answer.result_markdown, "| Name   |\n|:-------|\n| Gadget |");
    assert_eq!(answer.summary, "Gadget costs the most.");
    assert!(answer.debug.llm_prompt.ends_with("User Question: Which product costs the most?\n\nSQL:"));
    assert!(answer.debug.judge_prompt.contains("| Gadget |"));
    assert_eq!(app.backend.chat_requests().len(), 2);
}

#[tokio::test]
async fn improved_sql_replaces_the_result() {
    let app = test_app(None).await;
    app.backend.push_chat(sql_answer(PRICIEST_SQL, ""));
    app.backend.push_chat(sql_answer("SELECT COUNT(*) AS n FROM product", "There are 3 products."));

    let answer = app.state.text_to_sql_service.answer("How many products?").await.unwrap();

    assert_eq!(answer.sql_query, "SELECT COUNT(*) AS n FROM product");
    assert_eq!(answer.result_markdown, "| n |\n|--:|\n| 3 |");
    assert_eq!(answer.summary, "There are 3 products.");
}

#[tokio::test]
async fn failing_improvement_keeps_first_result_and_draft_summary() {
    let app = test_app(None).await;
    app.backend.push_chat(sql_answer(PRICIEST_SQL, "Gadget is the priciest."));
    app.backend.push_chat(sql_answer("SELECT nope FROM missing_table", ""));

    let answer = app.state.text_to_sql_service.answer("Which product costs the most?").await.unwrap();

    assert_eq!(answer.sql_query, PRICIEST_SQL);
    assert!(answer.result_markdown.contains("Gadget"));
    assert_eq!(answer.summary, "Gadget is the priciest.");
}

#[tokio::test]
async fn summary_falls_back_to_a_third_call() {
    let app = test_app(None).await;
    app.backend.push_chat(ChatCompletion::text("SELECT Name FROM product WHERE Key = 1"));
    app.backend.push_chat_error(LLMError::Timeout(120));
    app.backend.push_chat(ChatCompletion::text("  The product is Widget.  "));

    let answer = app.state.text_to_sql_service.answer("What is product 1?").await.unwrap();

    assert_eq!(answer.sql_query, "SELECT Name FROM product WHERE Key = 1");
    assert!(answer.debug.judge_response.is_none());
    assert_eq!(answer.summary, "The product is Widget.");

    let markdown = answer.to_markdown();
    assert!(markdown.starts_with("The product is Widget.\n\n```sql\nSELECT Name FROM product WHERE Key = 1\n```"));
}

#[tokio::test]
async fn generation_failure_is_a_server_error() {
    let app = test_app(None).await;
    app.backend.push_chat_error(LLMError::ApiError("upstream down".to_string()));

    let err = app.state.text_to_sql_service.answer("anything").await.unwrap_err();

    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.message().starts_with("LLM SQL generation failed:"));
}

#[tokio::test]
async fn unsafe_sql_is_not_executed() {
    let app = test_app(None).await;
    app.backend.push_chat(ChatCompletion::text("DELETE FROM product"));

    let err = app.state.text_to_sql_service.answer("Remove everything").await.unwrap_err();

    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.message().starts_with("SQL execution failed:"));
    let remaining = app.state.datastore.execute("SELECT COUNT(*) AS n FROM product").await.unwrap();
    assert_eq!(remaining.to_markdown(), "| n |\n|--:|\n| 3 |");
}

#[tokio::test]
async fn retriever_ranks_tables_by_embedding_distance() {
    let backend = ScriptedBackend::new().with_embedder(|text| {
        if text.contains("customer") {
            Some(vector(&[0.0, 1.0]))
        } else if text.contains("product") {
            Some(vector(&[1.0, 0.0]))
        } else {
            None
        }
    });
    let app = test_app_with(backend, None).await;

    let tables = app.state.retriever.retrieve_tables("Which customer joined first?", 1).await.unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].table, "customer");

    let context = app.state.retriever.retrieve_schema_context("Cheapest product?", 2).await.unwrap();
    assert_eq!(context.len(), 2);
    assert!(context[0].starts_with("Table product:"));

    let described = app
        .backend
        .embedded_texts()
        .into_iter()
        .filter(|t| t.starts_with("Table "))
        .count();
    assert_eq!(described, 2);
}

#[tokio::test]
async fn route_answers_with_the_envelope() {
    let app = test_app(None).await;
    app.backend.push_chat(sql_answer(PRICIEST_SQL, "Gadget."));
    app.backend.push_chat(ChatCompletion::text("Gadget is the most expensive product."));

    let (status, body) = send(
        &app.router,
        post_json("/v1/text-to-sql/", json!({"question": "Which product costs the most?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payload"]["question"], "Which product costs the most?");
    assert_eq!(body["payload"]["sql_query"], PRICIEST_SQL);
    assert_eq!(body["payload"]["summary"], "Gadget is the most expensive product.");
}

#[tokio::test]
async fn route_requires_a_question() {
    let app = test_app(None).await;
    let (status, body) =
        send(&app.router, post_json("/v1/text-to-sql", json!({"question": "   "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["payload"]["question"][0], "Missing 'question' in request");
}
