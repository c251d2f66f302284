use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::commands::Command;
use crate::models::{ChatMessage, Role, ToolCall};
use crate::services::llm::prompts::chat_prompt;
use crate::services::llm::{LLMError, LLMSession, PromptMessage, SchemaRetriever, Toolkit};
use crate::utils::{ApiError, ApiResult};

/// One chat turn: the model answers the conversation, and any tool calls it
/// makes are executed. Returns the input trace extended with the assistant
/// message and one message per tool result.
pub struct ProcessChatMessageCommand {
    chat_messages: Vec<ChatMessage>,
    session: Arc<LLMSession>,
    toolkit: Toolkit,
    retriever: Arc<SchemaRetriever>,
    schema_top_k: usize,
}

impl ProcessChatMessageCommand {
    pub fn new(
        chat_messages: Vec<ChatMessage>,
        session: Arc<LLMSession>,
        toolkit: Toolkit,
        retriever: Arc<SchemaRetriever>,
        schema_top_k: usize,
    ) -> Self {
        Self { chat_messages, session, toolkit, retriever, schema_top_k }
    }

    async fn prepare_chat_messages(&self) -> Vec<PromptMessage> {
        let trimmed = self.session.trim_message_history(&self.chat_messages);

        let latest_user_message =
            self.chat_messages.iter().rev().find(|m| m.role == Role::User);
        let schema_context = match latest_user_message {
            Some(msg) => self
                .retriever
                .retrieve_schema_context(msg.content_str(), self.schema_top_k)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Schema context unavailable: {}", e);
                    Vec::new()
                }),
            None => Vec::new(),
        };

        let mut messages = chat_prompt(&schema_context);
        messages.extend(trimmed);
        messages
    }

    async fn execute_tool_call(&self, tool_call: &ToolCall) -> Value {
        let arguments: Value = match serde_json::from_str(&tool_call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!("Invalid arguments for tool {}: {}", tool_call.function.name, e);
                return json!({"error": format!("Invalid tool arguments: {}", e)});
            },
        };

        match self.toolkit.run_tool(&tool_call.function.name, arguments).await {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(other) => json!({"value": other}),
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", tool_call.function.name, e);
                json!({"error": e.to_string()})
            },
        }
    }
}

#[async_trait]
impl Command for ProcessChatMessageCommand {
    type Output = Vec<ChatMessage>;

    fn name(&self) -> &'static str {
        "ProcessChatMessageCommand"
    }

    fn validate(&self) -> ApiResult<()> {
        if self.chat_messages.is_empty() {
            return Err(ApiError::validation_error("Chat messages are required."));
        }
        Ok(())
    }

    async fn execute(mut self) -> ApiResult<Vec<ChatMessage>> {
        tracing::debug!(
            "Command {} started with {} messages.",
            self.name(),
            self.chat_messages.len()
        );

        let messages = self.prepare_chat_messages().await;
        let tools = self.toolkit.tool_schemas();

        let completion = match self.session.chat(messages, Some(tools)).await {
            Ok(completion) => completion,
            Err(e @ LLMError::BadRequest(_)) => return Err(e.into()),
            Err(e) => {
                tracing::error!("Failed to fetch chat response: {}", e);
                return Err(ApiError::validation_error("Error in fetching chat response."));
            },
        };

        tracing::debug!("LLM finish_reason: {:?}", completion.finish_reason);

        let mut response_message = ChatMessage::generated(Role::Assistant, completion.content.clone());
        response_message.finish_reason = completion.finish_reason.clone();

        let mut tool_messages = Vec::new();
        if completion.wants_tools() {
            let tool_calls: Vec<ToolCall> = completion
                .tool_calls
                .iter()
                .map(|call| ToolCall { call_type: "function".to_string(), ..call.clone() })
                .collect();

            for tool_call in &tool_calls {
                let result = self.execute_tool_call(tool_call).await;
                let mut tool_message = ChatMessage::generated(Role::Tool, Some(result.to_string()));
                tool_message.tool_call_id = Some(tool_call.id.clone());
                tool_messages.push(tool_message);
            }

            response_message.tool_calls = Some(tool_calls);
        }

        self.chat_messages.push(response_message);
        self.chat_messages.extend(tool_messages);
        Ok(self.chat_messages)
    }
}
