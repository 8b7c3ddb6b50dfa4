//! The contract between the session controller and a model provider.

use crate::chunk::ChunkStream;
use async_trait::async_trait;
use serde_json::Value;
use toolbridge_core::{Message, ToolCallPart, ToolCallResult, ToolResultPart};
use toolbridge_error::SessionResult;

/// Whether the model may call the attached tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// The model decides
    #[default]
    Auto,
    /// Definitions stay attached for the transcript's sake, but no call is allowed
    None,
}

/// Everything an adapter needs to issue one streaming generation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdapterRequest {
    /// Conversation so far, oldest first
    pub messages: Vec<Message>,
    /// Provider-native tool definitions
    pub tools: Vec<Value>,
    /// Whether calls to `tools` are allowed
    pub tool_choice: ToolChoice,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl AdapterRequest {
    /// Whether tool definitions are attached.
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Whether the model may call the attached tools.
    pub fn allows_tool_calls(&self) -> bool {
        self.has_tools() && self.tool_choice == ToolChoice::Auto
    }

    /// Whether tools are attached but calls are forbidden.
    pub fn forbids_tool_calls(&self) -> bool {
        self.has_tools() && self.tool_choice == ToolChoice::None
    }
}

/// A model provider that streams responses.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Provider key matching the converter registry.
    fn provider(&self) -> &str;

    /// Starts a streaming generation.
    ///
    /// Errors returned here happen before any chunk is produced; errors
    /// inside the stream end the turn.
    async fn stream(&self, request: AdapterRequest) -> SessionResult<ChunkStream>;

    /// Shapes a tool result for the transcript.
    fn tool_result_message(&self, call: &ToolCallPart, result: &ToolCallResult) -> Message {
        Message::tool_result(ToolResultPart {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content: result.content_text(),
            is_error: !result.success,
        })
    }
}
