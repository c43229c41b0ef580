//! Provider trait — the abstraction over the LLM backend.
//!
//! A `Provider` knows how to send a prompt to an LLM and stream the response
//! back chunk by chunk, including incremental tool-call requests. The turn
//! runner consumes the stream without knowing which backend is configured.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ChatMessage, Role};

/// A tool definition sent to the LLM so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// The provider-assigned call id.
    pub id: String,

    pub name: String,

    /// Arguments as the raw JSON string the model produced.
    pub arguments: String,
}

/// Role of an LLM-facing prompt message.
///
/// Distinct from [`Role`]: persisted messages only know user/assistant, while
/// the wire conversation also carries system instructions and tool results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in the LLM-facing conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,

    pub content: String,

    /// Tool calls requested by the assistant (if any).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// If this is a tool result, the call it responds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// An assistant message that requested tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolInvocation>) -> Self {
        Self {
            role: PromptRole::Assistant,
            content: content.into(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// The result of executing one tool call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }
}

impl From<&ChatMessage> for PromptMessage {
    fn from(msg: &ChatMessage) -> Self {
        match msg.role {
            Role::User => Self::user(&msg.content),
            Role::Assistant => Self::assistant(&msg.content),
        }
    }
}

/// A streaming completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,

    pub messages: Vec<PromptMessage>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A single chunk in a streaming response.
///
/// Text fragments arrive with `content` set; accumulated tool calls arrive
/// on the final chunk with `done = true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            done: false,
        }
    }

    pub fn finished(tool_calls: Vec<ToolInvocation>) -> Self {
        Self {
            content: None,
            tool_calls,
            done: true,
        }
    }
}

/// The LLM backend abstraction.
///
/// The single operation is a streaming completion: the returned receiver
/// yields text fragments in arrival order, then exactly one `done` chunk
/// carrying any tool calls the model requested.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    >;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn chat_message_converts_to_prompt_message() {
        let msg = ChatMessage {
            id: 1,
            session_id: 1,
            role: Role::User,
            content: "你好".into(),
            created_at: Utc::now(),
        };
        let prompt: PromptMessage = (&msg).into();
        assert_eq!(prompt.role, PromptRole::User);
        assert_eq!(prompt.content, "你好");
        assert!(prompt.tool_calls.is_empty());
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = PromptMessage::tool_result("call_7", r#"{"ok":true}"#);
        assert_eq!(msg.role, PromptRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "get_team_members".into(),
            description: "获取所属组织的团队成员列表".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "specialization": { "type": "string" }
                }
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("get_team_members"));
        assert!(json.contains("specialization"));
    }

    #[test]
    fn stream_chunk_constructors() {
        let chunk = StreamChunk::text("您好");
        assert_eq!(chunk.content.as_deref(), Some("您好"));
        assert!(!chunk.done);

        let done = StreamChunk::finished(vec![]);
        assert!(done.done);
        assert!(done.content.is_none());
    }
}
