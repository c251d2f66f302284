//! LLM Data Models
//!
//! Model registries, wire types for OpenAI-compatible chat completions and
//! the LLM error type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ChatMessage, Role, ToolCall};

// ============================================================================
// Model registries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatModel {
    pub name: &'static str,
    pub description: &'static str,
    pub token_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbeddingModel {
    pub name: &'static str,
    pub description: &'static str,
    pub dimensions: usize,
}

pub const CHAT_MODELS: &[ChatModel] = &[
    ChatModel { name: "gpt-4o-mini", description: "The GPT-4o Mini model.", token_limit: 128_000 },
    ChatModel { name: "gpt-4o", description: "The GPT-4o model.", token_limit: 128_000 },
    ChatModel { name: "o3-mini", description: "The O3 Mini model.", token_limit: 200_000 },
    ChatModel { name: "o1", description: "The O1 model", token_limit: 200_000 },
    ChatModel { name: "o1-mini", description: "The O1 Mini model.", token_limit: 200_000 },
    ChatModel {
        name: "gpt-4.5-preview",
        description: "The GPT-4.5 Preview model.",
        token_limit: 128_000,
    },
    ChatModel {
        name: "us.anthropic.claude-3-7-sonnet-20250219-v1:0",
        description: "The Claude 3.7 Sonnet model.",
        token_limit: 200_000,
    },
    ChatModel {
        name: "us.anthropic.claude-3-5-sonnet-20241022-v2:0",
        description: "The Claude 3.5v2 Sonnet model.",
        token_limit: 200_000,
    },
    ChatModel {
        name: "anthropic.claude-3-sonnet-20240229-v1:0",
        description: "The Claude 3 Sonnet model.",
        token_limit: 28_000,
    },
    ChatModel {
        name: "anthropic.claude-3-haiku-20240307-v1:0",
        description: "The Claude 3 Haiku model.",
        token_limit: 48_000,
    },
];

pub const EMBEDDING_MODELS: &[EmbeddingModel] = &[
    EmbeddingModel {
        name: "text-embedding-3-small",
        description: "The OpenAI Embedding 3 Small model.",
        dimensions: 1536,
    },
    EmbeddingModel {
        name: "text-embedding-3-large",
        description: "The OpenAI Embedding 3 Large model.",
        dimensions: 3072,
    },
    EmbeddingModel {
        name: "cohere.embed-english-v3",
        description: "The Embed English v3 model from Cohere.",
        dimensions: 1024,
    },
    EmbeddingModel {
        name: "amazon.titan-embed-text-v2:0",
        description: "The Titan Embed Text v2 model from Amazon.",
        dimensions: 1024,
    },
];

pub fn find_chat_model(name: &str) -> Result<&'static ChatModel, LLMError> {
    CHAT_MODELS.iter().find(|m| m.name == name).ok_or_else(|| {
        LLMError::InvalidModel(invalid_model_message(
            "chat",
            name,
            CHAT_MODELS.iter().map(|m| m.name),
        ))
    })
}

pub fn find_embedding_model(name: &str) -> Result<&'static EmbeddingModel, LLMError> {
    EMBEDDING_MODELS.iter().find(|m| m.name == name).ok_or_else(|| {
        LLMError::InvalidModel(invalid_model_message(
            "embedding",
            name,
            EMBEDDING_MODELS.iter().map(|m| m.name),
        ))
    })
}

fn invalid_model_message<'a>(
    kind: &str,
    name: &str,
    valid: impl Iterator<Item = &'a str>,
) -> String {
    let valid: Vec<String> = valid.map(|n| format!("'{}'", n)).collect();
    format!("Invalid {} model: {}. Must be one of [{}]", kind, name, valid.join(", "))
}

// ============================================================================
// Chat completion wire types
// ============================================================================

/// Message as sent to the provider (trace metadata stripped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: Some(content.into()), tool_calls: None, tool_call_id: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: Some(content.into()), tool_calls: None, tool_call_id: None }
    }
}

impl From<&ChatMessage> for PromptMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg.tool_calls.clone().filter(|calls| !calls.is_empty()),
            tool_call_id: msg.tool_call_id.clone().filter(|id| !id.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(rename = "guardrailIdentifier")]
    pub guardrail_identifier: String,
    #[serde(rename = "guardrailVersion")]
    pub guardrail_version: String,
    pub trace: String,
}

impl GuardrailConfig {
    pub fn draft(identifier: impl Into<String>) -> Self {
        Self {
            guardrail_identifier: identifier.into(),
            guardrail_version: "DRAFT".to_string(),
            trace: "enabled".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(rename = "guardrailConfig", skip_serializing_if = "Option::is_none")]
    pub guardrail_config: Option<GuardrailConfig>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<PromptMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
            temperature: None,
            max_tokens: None,
            guardrail_config: None,
        }
    }
}

/// First choice of a chat completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: Some("stop".to_string()),
            ..Default::default()
        }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self { finish_reason: Some("tool_calls".to_string()), tool_calls, ..Default::default() }
    }

    pub fn wants_tools(&self) -> bool {
        self.finish_reason.as_deref() == Some("tool_calls")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
}

// ============================================================================
// LLM Error Types
// ============================================================================

/// LLM service errors
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("LLM service disabled")]
    Disabled,

    #[error("LLM provider not configured: {0}")]
    NotConfigured(String),

    #[error("LLM rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("LLM timeout after {0}s")]
    Timeout(u64),

    #[error("LLM provider rejected the request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    InvalidModel(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("LLM response parsing error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        assert_eq!(find_chat_model("gpt-4o").unwrap().token_limit, 128_000);
        assert_eq!(
            find_chat_model("anthropic.claude-3-sonnet-20240229-v1:0").unwrap().token_limit,
            28_000
        );
        assert_eq!(find_embedding_model("text-embedding-3-large").unwrap().dimensions, 3072);
    }

    #[test]
    fn unknown_model_names_valid_choices() {
        let err = find_chat_model("gpt-2").unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid chat model: gpt-2. Must be one of ['gpt-4o-mini', "));
        assert!(matches!(err, LLMError::InvalidModel(_)));

        let msg = find_embedding_model("ada").unwrap_err().to_string();
        assert!(msg.starts_with("Invalid embedding model: ada."));
        assert!(msg.contains("'amazon.titan-embed-text-v2:0'"));
    }

    #[test]
    fn guardrail_config_wire_names() {
        let mut req = ChatRequest::new("gpt-4o", vec![PromptMessage::user("hi")]);
        req.guardrail_config = Some(GuardrailConfig::draft("gr-1"));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["guardrailConfig"]["guardrailIdentifier"], "gr-1");
        assert_eq!(json["guardrailConfig"]["guardrailVersion"], "DRAFT");
        assert_eq!(json["guardrailConfig"]["trace"], "enabled");
        assert!(json.get("tools").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn prompt_message_drops_empty_tool_fields() {
        let mut msg = ChatMessage::user("hello");
        msg.tool_calls = Some(vec![]);
        msg.tool_call_id = Some(String::new());
        let prompt = PromptMessage::from(&msg);
        assert!(prompt.tool_calls.is_none());
        assert!(prompt.tool_call_id.is_none());
    }
}
