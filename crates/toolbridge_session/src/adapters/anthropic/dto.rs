//! Wire types for the Anthropic Messages API with streaming.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Streaming Messages API request.
#[derive(Debug, Clone, Serialize, Builder, Getters)]
#[builder(setter(into), pattern = "owned")]
pub struct AnthropicRequest {
    /// Model identifier
    model: String,
    /// Alternating user/assistant messages
    messages: Vec<AnthropicMessage>,
    /// Maximum tokens to generate
    max_tokens: u32,
    /// System prompt
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Native tool definitions
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    /// `{"type": "none"}` forbids calls to the attached tools
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    /// Always true for this adapter
    #[builder(default = "true")]
    stream: bool,
}

impl AnthropicRequest {
    /// Creates a builder for `AnthropicRequest`.
    pub fn builder() -> AnthropicRequestBuilder {
        AnthropicRequestBuilder::default()
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnthropicMessage {
    /// "user" or "assistant"
    pub role: String,
    /// Content blocks
    pub content: Vec<ContentBlock>,
}

/// Content block in a request message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text {
        /// Text content
        text: String,
    },
    /// A tool call made by the assistant
    ToolUse {
        /// Call id
        id: String,
        /// Tool name
        name: String,
        /// Arguments object
        input: Value,
    },
    /// A tool result sent back by the user turn
    ToolResult {
        /// Id of the answered call
        tool_use_id: String,
        /// Result text
        content: String,
        /// Whether the call failed
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// One event of a Messages stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Opens the message; carries input token usage
    MessageStart {
        /// Message envelope
        message: MessageStart,
    },
    /// Opens a content block
    ContentBlockStart {
        /// Block position
        index: usize,
        /// Block header
        content_block: BlockStart,
    },
    /// Extends a content block
    ContentBlockDelta {
        /// Block position
        index: usize,
        /// Delta payload
        delta: BlockDelta,
    },
    /// Closes a content block
    ContentBlockStop {
        /// Block position
        index: usize,
    },
    /// Carries the stop reason and output token usage
    MessageDelta {
        /// Stop reason
        delta: MessageDeltaBody,
        /// Cumulative output usage
        #[serde(default)]
        usage: Option<EventUsage>,
    },
    /// Closes the message
    MessageStop,
    /// Keep-alive
    Ping,
    /// Server-side failure mid-stream
    Error {
        /// Error details
        error: StreamErrorBody,
    },
    /// Event types this adapter does not read
    #[serde(other)]
    Unknown,
}

/// Envelope of a `message_start` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageStart {
    /// Usage so far
    #[serde(default)]
    pub usage: Option<EventUsage>,
}

/// Header of a content block.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockStart {
    /// Text block
    Text {
        /// Initial text, usually empty
        #[serde(default)]
        text: String,
    },
    /// Tool call block
    ToolUse {
        /// Call id
        id: String,
        /// Tool name
        name: String,
    },
    /// Other block types (thinking, etc.)
    #[serde(other)]
    Other,
}

/// Delta inside a `content_block_delta` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    /// Text appended to a text block
    TextDelta {
        /// Text
        text: String,
    },
    /// Argument JSON appended to a tool call block
    InputJsonDelta {
        /// Partial JSON text
        partial_json: String,
    },
    /// Other delta types
    #[serde(other)]
    Other,
}

/// Body of a `message_delta` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDeltaBody {
    /// Why generation stopped
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Token counts in stream events.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EventUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub input_tokens: u32,
    /// Tokens generated so far
    #[serde(default)]
    pub output_tokens: u32,
}

/// Error payload of an `error` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamErrorBody {
    /// Error type, e.g. "overloaded_error"
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}
