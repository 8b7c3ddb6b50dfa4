//! Configuration loading for the CLI.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use toolbridge::BridgeConfiguration;
use tracing::debug;

/// Loads the configuration file (or defaults) and applies the host URL override.
pub fn load_config(path: Option<&Path>, host_url: Option<&str>) -> Result<BridgeConfiguration> {
    let config = match path {
        Some(path) => BridgeConfiguration::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => BridgeConfiguration::default(),
    };

    match host_url {
        Some(url) => {
            debug!(url, "Overriding execution host URL");
            config
                .merge(&json!({"host": {"base_url": url}}))
                .context("applying --host-url")
        }
        None => Ok(config),
    }
}
