//! Tracing subscriber initialization.

use crate::DiagnosticsConfig;
use toolbridge_error::{ConfigError, ConfigErrorKind};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the configured verbosity applies.
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(config: &DiagnosticsConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.as_filter()));

    let result = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };

    result.map_err(|e| ConfigError::new(ConfigErrorKind::Tracing(e.to_string())))?;
    tracing::debug!(
        verbosity = config.verbosity.as_filter(),
        json = config.json,
        "Tracing initialized"
    );
    Ok(())
}
