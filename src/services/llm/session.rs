//! LLM session: model selection, chat calls, token budgeting and embeddings.

use once_cell::sync::Lazy;
use serde_json::{Value, json};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

use super::client::ChatBackend;
use super::models::*;
use super::structured_outputs::StructuredOutput;
use crate::config::LlmConfig;
use crate::models::ChatMessage;

static TOKENIZER: Lazy<CoreBPE> =
    Lazy::new(|| tiktoken_rs::p50k_base().expect("p50k_base ranks are bundled"));

pub struct LLMSession {
    backend: Arc<dyn ChatBackend>,
    enabled: bool,
    chat_model: &'static ChatModel,
    embedding_model: &'static EmbeddingModel,
    guardrails_id: Option<String>,
}

impl LLMSession {
    pub fn new(backend: Arc<dyn ChatBackend>, config: &LlmConfig) -> Result<Self, LLMError> {
        let chat_model = find_chat_model(&config.chat_model)?;
        let embedding_model = find_embedding_model(&config.embedding_model)?;

        if embedding_model.dimensions != config.knn_embedding_dimension {
            return Err(LLMError::InvalidModel(format!(
                "Embedding model {} produces {} dimensions but KNN_EMBEDDING_DIMENSION is {}",
                embedding_model.name, embedding_model.dimensions, config.knn_embedding_dimension
            )));
        }

        Ok(Self {
            backend,
            enabled: config.enabled,
            chat_model,
            embedding_model,
            guardrails_id: config.guardrails_id.clone().filter(|id| !id.is_empty()),
        })
    }

    pub fn chat_model(&self) -> &'static ChatModel {
        self.chat_model
    }

    pub fn embedding_model(&self) -> &'static EmbeddingModel {
        self.embedding_model
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embedding_model.dimensions
    }

    fn ensure_enabled(&self) -> Result<(), LLMError> {
        if self.enabled { Ok(()) } else { Err(LLMError::Disabled) }
    }

    fn request(&self, messages: Vec<PromptMessage>) -> ChatRequest {
        let mut request = ChatRequest::new(self.chat_model.name, messages);
        if let Some(id) = &self.guardrails_id {
            request.guardrail_config = Some(GuardrailConfig::draft(id.clone()));
        }
        request
    }

    /// Send a conversation, optionally offering tools
    pub async fn chat(
        &self,
        messages: Vec<PromptMessage>,
        tools: Option<Vec<Value>>,
    ) -> Result<ChatCompletion, LLMError> {
        self.ensure_enabled()?;

        let mut request = self.request(messages);
        request.tools = tools.filter(|t| !t.is_empty());

        match self.backend.chat(&request).await {
            Ok(completion) => {
                tracing::debug!(
                    "Chat response: finish_reason={:?}, tool_calls={}",
                    completion.finish_reason,
                    completion.tool_calls.len()
                );
                if let Some(usage) = completion.usage {
                    tracing::debug!(
                        "Tokens used: prompt={}, completion={}",
                        usage.prompt_tokens,
                        usage.completion_tokens
                    );
                }
                Ok(completion)
            },
            Err(e) => {
                tracing::error!("Error sending messages to chat model: {}", e);
                Err(e)
            },
        }
    }

    /// Single-prompt completion: the prompt is sent as the system message and
    /// the trimmed answer text is returned.
    pub async fn complete(
        &self,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, LLMError> {
        self.ensure_enabled()?;

        let mut request = self.request(vec![PromptMessage::system(prompt)]);
        request.temperature = Some(temperature);
        request.max_tokens = Some(max_tokens);

        let completion = self.backend.chat(&request).await?;
        Ok(completion.content.unwrap_or_default().trim().to_string())
    }

    /// Force the model to answer through the output type's function schema
    /// and decode the arguments.
    pub async fn get_structured_output<T: StructuredOutput>(
        &self,
        messages: Vec<PromptMessage>,
    ) -> Result<T, LLMError> {
        if messages.is_empty() {
            tracing::error!("No messages provided to send to the API.");
            return Err(LLMError::InvalidInput("Messages list is empty.".to_string()));
        }
        self.ensure_enabled()?;

        let mut request = self.request(messages);
        request.tools = Some(vec![json!({"type": "function", "function": T::tool_call_schema()})]);
        request.tool_choice = Some(json!({"type": "function", "function": {"name": T::NAME}}));

        let completion = self.backend.chat(&request).await?;
        let call = completion
            .tool_calls
            .iter()
            .find(|c| c.function.name == T::NAME)
            .ok_or_else(|| {
                LLMError::ParseError(format!("Model did not call {}", T::NAME))
            })?;

        serde_json::from_str(&call.function.arguments).map_err(|e| {
            tracing::error!("Error parsing structured output: {}", e);
            LLMError::ParseError(format!("Error parsing structured output: {}", e))
        })
    }

    /// Token count of `text` under the `p50k_base` encoding
    pub fn count_tokens(text: &str) -> usize {
        TOKENIZER.encode_with_special_tokens(text).len()
    }

    pub fn validate_token_length(&self, text: &str, token_limit: usize) -> Result<(), LLMError> {
        if text.is_empty() {
            return Err(LLMError::InvalidInput("Text must be a non-empty string.".to_string()));
        }
        if Self::count_tokens(text) > token_limit {
            return Err(LLMError::InvalidInput(format!(
                "Text exceeds max token length of {}.",
                token_limit
            )));
        }
        Ok(())
    }

    /// Drop the oldest messages until the history fits the chat model's
    /// token limit.
    pub fn trim_message_history(&self, messages: &[ChatMessage]) -> Vec<PromptMessage> {
        trim_to_limit(messages, self.chat_model.token_limit)
    }

    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, LLMError> {
        let mut vectors = self.generate_embeddings(&[text.to_string()]).await?;
        Ok(vectors.pop().unwrap_or_else(|| vec![0.0; self.embedding_dimension()]))
    }

    /// Embed a batch; inputs the provider returned nothing for become zero
    /// vectors.
    pub async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LLMError> {
        self.ensure_enabled()?;
        let dim = self.embedding_dimension();

        let vectors = self
            .backend
            .embed(self.embedding_model.name, texts)
            .await
            .inspect_err(|e| tracing::error!("Error generating embeddings: {}", e))?;

        vectors
            .into_iter()
            .map(|v| match v {
                Some(v) if v.len() == dim => Ok(v),
                Some(v) => Err(LLMError::ParseError(format!(
                    "Embedding has {} dimensions, expected {}",
                    v.len(),
                    dim
                ))),
                None => Ok(vec![0.0; dim]),
            })
            .collect()
    }
}

fn trim_to_limit(messages: &[ChatMessage], token_limit: usize) -> Vec<PromptMessage> {
    let counts: Vec<usize> = messages
        .iter()
        .map(|m| m.content.as_deref().map(LLMSession::count_tokens).unwrap_or(0))
        .collect();
    let mut total: usize = counts.iter().sum();

    let mut start = 0;
    while total > token_limit && start < messages.len() {
        total -= counts[start];
        start += 1;
    }

    if start > 0 {
        tracing::debug!("Trimmed {} oldest messages to fit {} tokens", start, token_limit);
    }

    messages[start..].iter().map(PromptMessage::from).collect()
}
