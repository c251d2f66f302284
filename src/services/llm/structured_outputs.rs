//! Typed LLM outputs

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use super::prompts;
use super::session::LLMSession;

/// Output decoded from a forced function call
pub trait StructuredOutput: DeserializeOwned + Send {
    const NAME: &'static str;

    fn description() -> &'static str;

    fn parameters() -> Value;

    fn tool_call_schema() -> Value {
        json!({
            "name": Self::NAME,
            "description": Self::description(),
            "parameters": Self::parameters(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub query: String,
    #[serde(default)]
    pub result_markdown: String,
    #[serde(default)]
    pub explanation: String,
}

impl StructuredOutput for SqlQuery {
    const NAME: &'static str = "sql_query";

    fn description() -> &'static str {
        "A generated SQL query with its result and a plain English explanation."
    }

    fn parameters() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "title": "A generated SQL query for retrieving data from the table."
                },
                "result_markdown": {
                    "type": "string",
                    "title": "The result of the SQL query as a markdown table."
                },
                "explanation": {
                    "type": "string",
                    "title": "Plain English explanation of the result."
                }
            },
            "required": ["query"]
        })
    }
}

pub const NO_SUMMARY: &str = "No summary could be generated.";
pub const SUMMARY_UNAVAILABLE: &str = "Summary not available due to error.";

/// Business-friendly summary of a result table. Never fails: errors and
/// empty answers become fixed fallback texts.
pub async fn summarize_result(
    session: &LLMSession,
    question: &str,
    sql: &str,
    result_markdown: &str,
) -> String {
    let prompt = prompts::summarize_prompt(question, sql, result_markdown);
    match session.complete(&prompt, 0.2, 512).await {
        Ok(summary) if summary.trim().is_empty() => NO_SUMMARY.to_string(),
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!("Result summary failed: {}", e);
            SUMMARY_UNAVAILABLE.to_string()
        },
    }
}
