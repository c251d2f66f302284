use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{Tool, ToolError};
use crate::services::datastore::SqlDatastore;

#[derive(Debug, Deserialize)]
struct Arguments {
    query: String,
}

/// Runs a SQL query against the analytical store and returns the result as
/// a markdown table.
pub struct TextToSqlTool {
    datastore: Arc<SqlDatastore>,
}

impl TextToSqlTool {
    pub const NAME: &'static str = "text_to_sql";

    pub fn new(datastore: Arc<SqlDatastore>) -> Self {
        Self { datastore }
    }
}

#[async_trait]
impl Tool for TextToSqlTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "A tool for converting natural language queries to SQL queries."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A SQLite SQL query answering the user's question."
                }
            },
            "required": ["query"]
        })
    }

    async fn run(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: Arguments =
            serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
                tool: Self::NAME.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!("Converting natural language query to SQL query: {}", args.query);

        let result = self
            .datastore
            .execute(&args.query)
            .await
            .map_err(|e| ToolError::Execution(e.message()))?;

        Ok(Value::String(result.to_markdown()))
    }
}
