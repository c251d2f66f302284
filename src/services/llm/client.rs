//! LLM Client - HTTP client for OpenAI-compatible APIs
//!
//! Uses reqwest to call LLM APIs. Compatible with:
//! - OpenAI
//! - Azure OpenAI
//! - LiteLLM / Bedrock gateways exposing the OpenAI wire format
//! - Other OpenAI-compatible APIs

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::models::*;
use crate::config::LlmConfig;
use crate::models::ToolCall;

/// Transport used by [`super::LLMSession`]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion, LLMError>;

    /// One entry per input; `None` when the provider returned no vector for it
    async fn embed(&self, model: &str, inputs: &[String])
    -> Result<Vec<Option<Vec<f32>>>, LLMError>;
}

/// LLM HTTP Client
pub struct LLMClient {
    http_client: Client,
    api_base: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl LLMClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LLMError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LLMError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn api_key(&self) -> Result<&str, LLMError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| LLMError::NotConfigured("API key not configured".to_string()))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, LLMError> {
        let api_key = self.api_key()?;
        let url = format!("{}/{}", self.api_base, path);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout(self.timeout_secs)
                } else {
                    LLMError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(LLMError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status == reqwest::StatusCode::BAD_REQUEST {
                return Err(LLMError::BadRequest(error_text));
            }
            return Err(LLMError::ApiError(format!("API error {}: {}", status, error_text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for LLMClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion, LLMError> {
        tracing::debug!(
            "Calling LLM API: {}/chat/completions with model {} ({} messages)",
            self.api_base,
            request.model,
            request.messages.len()
        );

        let response = self.post("chat/completions", request).await?;
        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::ParseError("Empty response from LLM".to_string()))?;

        Ok(ChatCompletion {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            usage: chat_response.usage,
        })
    }

    async fn embed(
        &self,
        model: &str,
        inputs: &[String],
    ) -> Result<Vec<Option<Vec<f32>>>, LLMError> {
        let request = EmbeddingRequest { model, input: inputs };
        let response = self.post("embeddings", &request).await?;
        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; inputs.len()];
        for (pos, item) in embedding_response.data.into_iter().enumerate() {
            let idx = item.index.unwrap_or(pos);
            if let Some(slot) = vectors.get_mut(idx) {
                *slot = Some(item.embedding);
            }
        }
        Ok(vectors)
    }
}

// ============================================================================
// OpenAI API Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: Option<usize>,
}
