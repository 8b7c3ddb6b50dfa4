//! Bridge error taxonomy.

/// Error conditions raised while discovering, converting, or executing tools.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BridgeErrorKind {
    /// The execution host could not be reached (transport failure or 5xx).
    #[display("Execution host unreachable: {_0}")]
    HostUnreachable(String),
    /// The execution host does not know the requested tool.
    #[display("Tool not found: {_0}")]
    ToolNotFound(String),
    /// A canonical tool could not be converted for a provider.
    #[display("Schema conversion failed for '{tool}' ({provider}): {reason}")]
    SchemaConversion {
        /// Canonical tool name
        tool: String,
        /// Provider key
        provider: String,
        /// What went wrong
        reason: String,
    },
    /// The tool ran but reported a failure.
    #[display("Tool execution failed: {_0}")]
    ToolExecution(String),
    /// Arguments were rejected before or by the tool.
    #[display("Parameter validation failed: {_0}")]
    ParameterValidation(String),
    /// No converter is registered for the provider.
    #[display("Provider not supported: {_0}")]
    ProviderNotSupported(String),
    /// The bridge has not reached the ready state (or was disposed).
    #[display("Bridge not initialized")]
    BridgeNotInitialized,
    /// The execution host answered with an unexpected payload.
    #[display("Malformed response from execution host: {_0}")]
    MalformedResponse(String),
    /// A single attempt exceeded its deadline.
    #[display("Timed out after {_0}ms")]
    Timeout(u64),
    /// The owning session cancelled the operation.
    #[display("Cancelled")]
    Cancelled,
    /// The execution host rejected our credentials.
    #[display("Unauthorized: {_0}")]
    Unauthorized(String),
    /// Configuration was invalid.
    #[display("Configuration error: {_0}")]
    Config(String),
}

impl BridgeErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeErrorKind::HostUnreachable(_) | BridgeErrorKind::Timeout(_)
        )
    }

    /// Map an HTTP status code from the execution host to an error kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => BridgeErrorKind::ToolNotFound(message),
            401 | 403 => BridgeErrorKind::Unauthorized(message),
            400 | 422 => BridgeErrorKind::ParameterValidation(message),
            500..=599 => BridgeErrorKind::HostUnreachable(format!("HTTP {}: {}", status, message)),
            _ => BridgeErrorKind::ToolExecution(format!("HTTP {}: {}", status, message)),
        }
    }
}

/// Bridge error with location tracking.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Bridge Error: {} at line {} in {}", kind, line, file)]
pub struct BridgeError {
    kind: BridgeErrorKind,
    line: u32,
    file: &'static str,
}

impl BridgeError {
    /// Create a new bridge error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: BridgeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &BridgeErrorKind {
        &self.kind
    }

    /// Consume the error, returning its kind.
    pub fn into_kind(self) -> BridgeErrorKind {
        self.kind
    }

    /// Whether the operation that produced this error may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl<T> From<T> for BridgeError
where
    T: Into<BridgeErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
