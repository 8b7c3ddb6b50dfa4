//! Core data types for the Toolbridge tool-calling bridge.
//!
//! This crate provides the data model shared by every other crate: canonical
//! tools and their provider-shaped counterparts, tool call requests and results,
//! execution bookkeeping records, the conversation transcript, and the
//! process-wide [`BridgeConfiguration`].

mod call;
mod config;
mod message;
mod observability;
mod record;
mod tool;

pub use call::{RequestMetadata, ResultMetadata, ToolCallRequest, ToolCallResult, ToolErrorKind};
pub use config::{
    BridgeConfiguration, CacheConfig, DiagnosticsConfig, HostConfig, ProviderSettings,
    SessionConfig, Verbosity, DEFAULT_DEAD_SWITCH_DIRECTIVE, merge_json,
};
pub use message::{FinishReason, Message, Part, Role, ToolCallPart, ToolResultPart, Usage};
pub use observability::init_tracing;
pub use record::{ExecutionRecord, ExecutionStatus};
pub use tool::{ProviderTool, Tool, catalog_hash};
