use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::utils::{clean_object, get_timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}

/// One entry of a conversation trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            content: Some(content.into()),
            timestamp: None,
            finish_reason: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Message produced by the service: fresh id and a nanosecond timestamp
    pub fn generated(role: Role, content: Option<String>) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            role,
            content,
            timestamp: Some(get_timestamp(true)),
            finish_reason: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

// ========================================
// Request schemas
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChatMessageInput {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Missing data for required field."),
        custom(function = "validate_role")
    )]
    #[schema(example = "user")]
    pub role: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Missing data for required field."))]
    #[schema(example = "How many customers do we have?")]
    pub content: String,

    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,

    #[serde(default)]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChatMessagesRequest {
    #[serde(default)]
    #[validate(required(message = "Missing data for required field."), nested)]
    pub messages: Option<Vec<ChatMessageInput>>,
}

impl ChatMessagesRequest {
    /// Trim string fields of every message and drop blank ones, so that
    /// `"  "` fails validation the same way a missing field does.
    pub fn clean(mut body: Value) -> Value {
        if let Some(Value::Array(items)) = body.get_mut("messages") {
            let cleaned: Vec<Value> = items.drain(..).map(clean_object).collect();
            *items = cleaned;
        }
        body
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages.unwrap_or_default().into_iter().map(ChatMessage::from).collect()
    }
}

impl From<ChatMessageInput> for ChatMessage {
    fn from(input: ChatMessageInput) -> Self {
        Self {
            id: None,
            role: Role::parse(&input.role).unwrap_or(Role::User),
            content: Some(input.content),
            timestamp: None,
            finish_reason: None,
            tool_calls: input.tool_calls.filter(|calls| !calls.is_empty()),
            tool_call_id: input.tool_call_id,
        }
    }
}

fn validate_role(role: &str) -> Result<(), ValidationError> {
    if Role::parse(role).is_some() {
        return Ok(());
    }
    Err(ValidationError::new("role").with_message(Cow::Owned(format!(
        "Invalid role '{}'. Must be one of system, user, assistant, tool.",
        role
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_message_serializes_null_content() {
        let mut msg = ChatMessage::generated(Role::Assistant, None);
        msg.finish_reason = Some("tool_calls".into());
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
        assert_eq!(json["finish_reason"], "tool_calls");
        assert!(json.get("tool_call_id").is_none());
        assert!(json["id"].as_str().is_some());
        assert!(json["timestamp"].as_str().is_some());
    }

    #[test]
    fn tool_call_type_defaults_to_function() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "call_1",
            "function": {"name": "text_to_sql", "arguments": "{\"query\":\"SELECT 1\"}"}
        }))
        .unwrap();
        assert_eq!(call.call_type, "function");
        assert_eq!(serde_json::to_value(&call).unwrap()["type"], "function");
    }

    #[test]
    fn request_validation_reports_blank_fields() {
        let body = ChatMessagesRequest::clean(json!({
            "messages": [
                {"role": "user", "content": "   "},
                {"role": "robot", "content": "hi"}
            ]
        }));
        let request: ChatMessagesRequest = serde_json::from_value(body).unwrap();
        let errors = request.validate().unwrap_err();
        match errors.errors().get("messages") {
            Some(validator::ValidationErrorsKind::List(items)) => {
                assert!(items[&0].field_errors().contains_key("content"));
                assert!(items[&1].field_errors().contains_key("role"));
            },
            other => panic!("expected list errors, got {:?}", other),
        }
    }

    #[test]
    fn missing_messages_is_a_validation_error() {
        let request: ChatMessagesRequest = serde_json::from_value(json!({})).unwrap();
        let errors = request.validate().unwrap_err();
        let field_errors = errors.field_errors();
        let messages = field_errors.get("messages").expect("messages error");
        assert_eq!(messages[0].code, "required");
        assert_eq!(
            messages[0].message.as_deref(),
            Some("Missing data for required field.")
        );
    }

    #[test]
    fn empty_message_list_passes_schema_validation() {
        let request: ChatMessagesRequest = serde_json::from_value(json!({"messages": []})).unwrap();
        assert!(request.validate().is_ok());
        assert!(request.into_messages().is_empty());
    }

    #[test]
    fn input_converts_to_trace_message() {
        let body = ChatMessagesRequest::clean(json!({
            "messages": [{"role": " user ", "content": " How many products? "}]
        }));
        let request: ChatMessagesRequest = serde_json::from_value(body).unwrap();
        request.validate().unwrap();
        let messages = request.into_messages();
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content_str(), "How many products?");
    }
}
