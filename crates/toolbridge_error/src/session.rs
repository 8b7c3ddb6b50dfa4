//! Streaming session error types.

use crate::BridgeError;

/// Failures that end a conversation turn.
///
/// Tool failures are not listed here; they travel back to the model as
/// failed results.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SessionErrorKind {
    /// The provider's HTTP request failed before a response arrived.
    #[display("{provider} request failed: {message}")]
    Transport {
        /// Provider key
        provider: String,
        /// Transport error text
        message: String,
    },
    /// The provider answered with a non-success status.
    #[display("{provider} API error (status {status}): {message}")]
    Api {
        /// Provider key
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },
    /// A streamed event could not be decoded.
    #[display("Malformed stream event from {provider}: {message}")]
    MalformedStream {
        /// Provider key
        provider: String,
        /// Decoder error
        message: String,
    },
    /// The provider reported an error event mid-stream.
    #[display("{provider} aborted the stream: {message}")]
    StreamAborted {
        /// Provider key
        provider: String,
        /// Error reported by the provider
        message: String,
    },
    /// The provider request could not be built.
    #[display("Invalid provider request: {_0}")]
    InvalidRequest(String),
    /// The stream ended while tool-call arguments were still open.
    #[display("Stream ended with incomplete tool call(s): {_0}")]
    IncompleteToolCall(String),
    /// The operation is not valid in the session's current state.
    #[display("Invalid session state: {_0}")]
    InvalidState(String),
    /// The session was cancelled.
    #[display("Session cancelled")]
    Cancelled,
    /// The bridge refused the request.
    #[display("{_0}")]
    Bridge(BridgeError),
}

/// Session error with location tracking.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Session Error: {} at line {} in {}", kind, line, file)]
pub struct SessionError {
    kind: SessionErrorKind,
    line: u32,
    file: &'static str,
}

impl SessionError {
    /// Create a new session error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: SessionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SessionErrorKind {
        &self.kind
    }

    /// Whether the turn ended because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, SessionErrorKind::Cancelled)
    }
}

impl From<SessionErrorKind> for SessionError {
    #[track_caller]
    fn from(kind: SessionErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<BridgeError> for SessionError {
    #[track_caller]
    fn from(err: BridgeError) -> Self {
        Self::new(SessionErrorKind::Bridge(err))
    }
}

/// Result type for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;
