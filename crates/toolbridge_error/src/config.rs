//! Configuration loading and validation errors.

/// What went wrong with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// The file could not be read
    #[display("Failed to read {path}: {message}")]
    Read {
        /// Path that was read
        path: String,
        /// I/O error text
        message: String,
    },
    /// TOML or JSON did not match the configuration shape
    #[display("Failed to parse config: {_0}")]
    Parse(String),
    /// A value is out of range or malformed
    #[display("Invalid setting {key}: {message}")]
    Invalid {
        /// Dotted path of the offending setting
        key: &'static str,
        /// Constraint that was violated
        message: String,
    },
    /// A runtime patch was not a JSON object
    #[display("Configuration patch must be a JSON object")]
    PatchNotObject,
    /// The tracing subscriber could not be installed
    #[display("Failed to initialize tracing: {_0}")]
    Tracing(String),
}

/// Configuration error with location tracking.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// Create a new configuration error with automatic location tracking.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolbridge_error::{ConfigError, ConfigErrorKind};
    ///
    /// let err = ConfigError::new(ConfigErrorKind::Invalid {
    ///     key: "host.retries",
    ///     message: "must be at most 10".to_string(),
    /// });
    /// assert!(err.to_string().contains("host.retries"));
    /// ```
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for [`ConfigErrorKind::Invalid`].
    #[track_caller]
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid {
            key,
            message: message.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}

impl From<ConfigErrorKind> for ConfigError {
    #[track_caller]
    fn from(kind: ConfigErrorKind) -> Self {
        Self::new(kind)
    }
}
