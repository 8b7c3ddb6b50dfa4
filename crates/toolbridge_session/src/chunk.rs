//! Provider-neutral streaming chunks.

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use toolbridge_core::{FinishReason, Usage};
use toolbridge_error::SessionResult;

/// A piece of a tool call as the provider streamed it.
///
/// The first fragment for an index usually carries the id and name; later
/// fragments append argument text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    /// Position of the call within the response
    pub index: usize,
    /// Call id, when this fragment carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool name, when this fragment carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Argument text to append
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallFragment {
    /// A fragment that opens a call.
    pub fn start(index: usize, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: None,
        }
    }

    /// A fragment that appends argument text.
    pub fn arguments(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            arguments: Some(text.into()),
            ..Default::default()
        }
    }
}

/// One decoded event from a provider stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool call fragments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_call_fragments: Vec<ToolCallFragment>,
    /// Set once the provider signals the response is complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Token usage reported with this event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A text-only chunk.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// A chunk carrying one tool call fragment.
    pub fn fragment(fragment: ToolCallFragment) -> Self {
        Self {
            tool_call_fragments: vec![fragment],
            ..Default::default()
        }
    }

    /// A chunk carrying only the finish signal.
    pub fn finished(reason: FinishReason) -> Self {
        Self {
            finish_reason: Some(reason),
            ..Default::default()
        }
    }

    /// Whether the chunk carries nothing.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.tool_call_fragments.is_empty()
            && self.finish_reason.is_none()
            && self.usage.is_none()
    }
}

/// Boxed stream of chunks returned by an adapter.
pub type ChunkStream = Pin<Box<dyn Stream<Item = SessionResult<StreamChunk>> + Send>>;
