//! Tools the chat model may call, and the registry that dispatches them.

mod text_to_sql;

pub use text_to_sql::TextToSqlTool;

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("{0}")]
    Execution(String),
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the argument object
    fn parameters(&self) -> Value;

    async fn run(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Ordered tool registry
#[derive(Clone, Default)]
pub struct Toolkit {
    tools: Vec<Arc<dyn Tool>>,
}

impl Toolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a tool with the same name is replaced
    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.add_tool(tool);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Function-calling schemas in registration order
    pub fn tool_schemas(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters(),
                    }
                })
            })
            .collect()
    }

    pub async fn run_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        if !arguments.is_object() {
            return Err(ToolError::InvalidArguments {
                tool: name.to_string(),
                reason: "arguments must be a JSON object".to_string(),
            });
        }

        tracing::info!("Running tool {}", name);
        tool.run(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text argument."
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
        }

        async fn run(&self, arguments: Value) -> Result<Value, ToolError> {
            Ok(arguments["text"].clone())
        }
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let toolkit = Toolkit::new().with_tool(Arc::new(Echo));
        let out = toolkit.run_tool("echo", json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, json!("hi"));

        let err = toolkit.run_tool("missing", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: missing");

        let err = toolkit.run_tool("echo", json!("hi")).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn schemas_use_function_wrapper() {
        let toolkit = Toolkit::new().with_tool(Arc::new(Echo)).with_tool(Arc::new(Echo));
        let schemas = toolkit.tool_schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0]["type"], "function");
        assert_eq!(schemas[0]["function"]["name"], "echo");
        assert_eq!(schemas[0]["function"]["parameters"]["required"][0], "text");
        assert_eq!(toolkit.tool_names(), vec!["echo"]);
    }
}
