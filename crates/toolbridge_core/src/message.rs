//! Provider-neutral conversation transcript.
//!
//! Adapters translate these types to and from their wire formats.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call the assistant made, as recorded in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    /// Correlation id
    pub id: String,
    /// Name as the provider sent it
    pub name: String,
    /// Parsed arguments
    pub arguments: Value,
}

/// The result of a tool call, shaped for feeding back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPart {
    /// Id of the call this answers
    pub call_id: String,
    /// Tool name as the provider knows it
    pub name: String,
    /// Text rendering of the output or error
    pub content: String,
    /// Whether the call failed
    #[serde(default)]
    pub is_error: bool,
}

/// A part of a message's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    /// Plain text content.
    Text {
        /// The text
        text: String,
    },
    /// Tool call from the assistant.
    ToolCall(ToolCallPart),
    /// Tool result fed back to the model.
    ToolResult(ToolResultPart),
}

impl Part {
    /// Create a text part.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }
}

/// A message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    /// Create a message with a role and text content.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::text(text)],
        }
    }

    /// Create a user message with text.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant message with text.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Create a message from parts.
    pub fn from_parts(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// Create a tool-role message carrying one result.
    pub fn tool_result(part: ToolResultPart) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![Part::ToolResult(part)],
        }
    }

    /// Get combined text content.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract all tool calls.
    pub fn tool_calls(&self) -> Vec<&ToolCallPart> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }

    /// Extract all tool results.
    pub fn tool_results(&self) -> Vec<&ToolResultPart> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::ToolResult(tr) => Some(tr),
                _ => None,
            })
            .collect()
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FinishReason {
    /// Natural end of response.
    #[default]
    Stop,
    /// Model wants to call tools.
    ToolCalls,
    /// Hit token limit.
    Length,
    /// Content filtered.
    ContentFilter,
    /// Unknown reason (forward compatibility).
    Other(String),
}

impl FinishReason {
    /// Parse a provider's stop/finish reason string.
    pub fn from_provider(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" | "stop_sequence" | "STOP" => FinishReason::Stop,
            "tool_calls" | "tool_use" | "function_call" => FinishReason::ToolCalls,
            "length" | "max_tokens" | "MAX_TOKENS" => FinishReason::Length,
            "content_filter" | "SAFETY" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    /// Accumulate another usage report into this one.
    pub fn add(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}
