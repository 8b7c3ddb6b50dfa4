//! Tool call requests and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use toolbridge_error::BridgeErrorKind;

/// Context attached to a request by the session that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Conversation session that issued the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// When the model requested the call
    pub timestamp: DateTime<Utc>,
}

/// A model-requested invocation of one tool.
///
/// Created when a model requests a call; consumed exactly once by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Caller-assigned correlation key, unique per call
    pub id: String,
    /// Tool name (canonical, or the provider's sanitized name)
    pub name: String,
    /// Resolved argument map
    pub parameters: Value,
    /// Provider key the call originated from
    pub provider: String,
    /// Optional session context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RequestMetadata>,
}

impl ToolCallRequest {
    /// Creates a new request without metadata.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        parameters: Value,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parameters,
            provider: provider.into(),
            metadata: None,
        }
    }

    /// Attaches session metadata stamped with the current time.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.metadata = Some(RequestMetadata {
            session_id: Some(session_id.into()),
            timestamp: Utc::now(),
        });
        self
    }
}

/// Classification of a failed tool call, carried in result metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Transport failure or 5xx from the execution host
    #[display("host_unreachable")]
    HostUnreachable,
    /// Unknown tool
    #[display("tool_not_found")]
    ToolNotFound,
    /// Arguments rejected
    #[display("parameter_validation")]
    ParameterValidation,
    /// Tool ran and reported failure
    #[display("tool_execution")]
    ToolExecution,
    /// Attempt exceeded its deadline
    #[display("timeout")]
    Timeout,
    /// Owning session cancelled the call
    #[display("cancelled")]
    Cancelled,
    /// Credentials rejected
    #[display("unauthorized")]
    Unauthorized,
    /// Unexpected payload from the host
    #[display("malformed_response")]
    MalformedResponse,
}

impl From<&BridgeErrorKind> for ToolErrorKind {
    fn from(kind: &BridgeErrorKind) -> Self {
        match kind {
            BridgeErrorKind::HostUnreachable(_) => ToolErrorKind::HostUnreachable,
            BridgeErrorKind::ToolNotFound(_) => ToolErrorKind::ToolNotFound,
            BridgeErrorKind::ParameterValidation(_) => ToolErrorKind::ParameterValidation,
            BridgeErrorKind::Timeout(_) => ToolErrorKind::Timeout,
            BridgeErrorKind::Cancelled => ToolErrorKind::Cancelled,
            BridgeErrorKind::Unauthorized(_) => ToolErrorKind::Unauthorized,
            BridgeErrorKind::MalformedResponse(_) => ToolErrorKind::MalformedResponse,
            _ => ToolErrorKind::ToolExecution,
        }
    }
}

/// Bookkeeping attached to every result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Number of retries performed after the first attempt
    pub retry_count: u32,
    /// Failure classification, absent on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,
}

/// Outcome of one [`ToolCallRequest`]. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Matches the originating request id
    pub id: String,
    /// Whether the tool succeeded
    pub success: bool,
    /// Tool output on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time across all attempts, in milliseconds
    pub execution_time_ms: u64,
    /// Retry count and error classification
    pub metadata: ResultMetadata,
}

impl ToolCallResult {
    /// Creates a successful result.
    pub fn success(id: impl Into<String>, result: Value, elapsed: Duration, retry_count: u32) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
            execution_time_ms: elapsed.as_millis() as u64,
            metadata: ResultMetadata {
                retry_count,
                error_kind: None,
            },
        }
    }

    /// Creates a failed result.
    pub fn failure(
        id: impl Into<String>,
        kind: ToolErrorKind,
        error: impl Into<String>,
        elapsed: Duration,
        retry_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(error.into()),
            execution_time_ms: elapsed.as_millis() as u64,
            metadata: ResultMetadata {
                retry_count,
                error_kind: Some(kind),
            },
        }
    }

    /// Creates a failed result from a bridge error kind.
    pub fn from_error(
        id: impl Into<String>,
        kind: &BridgeErrorKind,
        elapsed: Duration,
        retry_count: u32,
    ) -> Self {
        Self::failure(id, ToolErrorKind::from(kind), kind.to_string(), elapsed, retry_count)
    }

    /// Total execution time.
    pub fn execution_time(&self) -> Duration {
        Duration::from_millis(self.execution_time_ms)
    }

    /// Failure classification, if any.
    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.metadata.error_kind
    }

    /// Renders the result as text for a model's tool-result message.
    pub fn content_text(&self) -> String {
        match (&self.result, &self.error) {
            (Some(Value::String(text)), _) if self.success => text.clone(),
            (Some(value), _) if self.success => value.to_string(),
            (_, Some(error)) => format!("Error: {}", error),
            _ => String::new(),
        }
    }
}
