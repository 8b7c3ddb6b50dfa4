//! Wire types for OpenAI-compatible chat completion streams.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in the chat format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    /// "system", "user", "assistant", or "tool"
    pub role: String,
    /// Text content; null on assistant messages that only call tools
    pub content: Option<String>,
    /// Calls made by an assistant message
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    /// Call answered by a tool message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// A plain text message.
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A tool call inside an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireToolCall {
    /// Call id
    pub id: String,
    /// Always "function"
    #[serde(rename = "type")]
    pub kind: String,
    /// Name and JSON-encoded arguments
    pub function: WireFunction,
}

/// Function half of a [`WireToolCall`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireFunction {
    /// Tool name
    pub name: String,
    /// Arguments as a JSON string
    pub arguments: String,
}

/// Asks the server to append a usage-only chunk before `[DONE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamOptions {
    /// Report token usage
    pub include_usage: bool,
}

/// Streaming chat completion request.
#[derive(Debug, Clone, Serialize, Builder, Getters)]
#[builder(setter(into))]
pub struct ChatRequest {
    /// Model identifier
    model: String,
    /// Conversation messages
    messages: Vec<ChatMessage>,
    /// Native tool definitions
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    /// `"none"` forbids calls to the attached tools
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    /// Maximum tokens to generate
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Always true for this adapter
    #[builder(default = "true")]
    stream: bool,
    /// Usage reporting
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

impl ChatRequest {
    /// Creates a new builder for ChatRequest.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }
}

/// One `data:` event of a chat completion stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChunk {
    /// Choice deltas; empty on the trailing usage chunk
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Token usage, when requested
    #[serde(default)]
    pub usage: Option<ChunkUsage>,
}

/// A choice inside a [`ChatChunk`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    /// Incremental content
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Set on the last chunk of the choice
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental content of a choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    /// Text delta
    #[serde(default)]
    pub content: Option<String>,
    /// Tool call deltas
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// A tool call delta, keyed by `index`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call in the response
    #[serde(default)]
    pub index: usize,
    /// Present on the first delta of a call
    #[serde(default)]
    pub id: Option<String>,
    /// Name and argument text
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

/// Function half of a [`ToolCallDelta`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDelta {
    /// Present on the first delta of a call
    #[serde(default)]
    pub name: Option<String>,
    /// Argument text to append
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Token counts reported by the server.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChunkUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,
}
