//! Streaming conversation sessions with tool calling.
//!
//! A [`SessionController`] streams model output through a [`ProviderAdapter`],
//! reassembles tool calls from their fragments with a [`ToolCallAccumulator`],
//! runs them through a [`ToolDispatcher`] (normally the
//! [`BridgeOrchestrator`](toolbridge_bridge::BridgeOrchestrator)), and loops
//! until the model answers or the iteration limit trips the dead switch.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod accumulator;
mod adapter;
mod adapters;
mod chunk;
mod controller;
mod dispatch;

pub use accumulator::{AssembledCall, ToolCallAccumulator};
pub use adapter::{AdapterRequest, ProviderAdapter, ToolChoice};
pub use adapters::{ANTHROPIC_API_VERSION, AnthropicAdapter, OpenAiCompatAdapter, SseDecoder};
pub use chunk::{ChunkStream, StreamChunk, ToolCallFragment};
pub use controller::{
    DEFAULT_CONTINUE_PROMPT, SessionController, SessionEvent, SessionState, TurnOutcome,
};
pub use dispatch::ToolDispatcher;
pub use toolbridge_error::{SessionError, SessionErrorKind, SessionResult};
