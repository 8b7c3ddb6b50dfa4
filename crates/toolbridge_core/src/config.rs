//! Process-wide bridge configuration.
//!
//! Loaded from TOML and replaceable at runtime through [`BridgeConfiguration::merge`],
//! which deep-merges a JSON patch over the current value: objects merge key by key,
//! arrays and scalars replace wholesale.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use toolbridge_error::{ConfigError, ConfigErrorKind};

/// Directive sent to the model once the tool iteration threshold is reached.
pub const DEFAULT_DEAD_SWITCH_DIRECTIVE: &str = "You have reached the maximum number of consecutive tool calls for this turn. \
Do not call any more tools. Summarize what you have done so far, what remains, \
and explicitly ask the user whether you should continue.";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfiguration {
    /// Execution host connection settings
    #[serde(default)]
    pub host: HostConfig,
    /// Per-provider enablement and feature sets, keyed by provider
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderSettings>,
    /// Logging settings
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    /// Conversion cache and execution record limits
    #[serde(default)]
    pub cache: CacheConfig,
    /// Streaming session limits
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for BridgeConfiguration {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            providers: default_providers(),
            diagnostics: DiagnosticsConfig::default(),
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Execution host endpoint, timeout, and retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Base URL of the execution host
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the list-tools endpoint
    #[serde(default = "default_tools_path")]
    pub tools_path: String,
    /// Path of the execute-tool endpoint
    #[serde(default = "default_execute_path")]
    pub execute_path: String,
    /// Path of the health endpoint
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Additional attempts after the first
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Delay before the first retry in milliseconds; doubles per attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Interval between health checks in milliseconds
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,
    /// Timeout for a single health check in milliseconds
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
    /// Optional bearer token for the execution host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl HostConfig {
    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base backoff delay.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Backoff cap.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Interval between health checks.
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    /// Health check timeout.
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// Joins the base URL with an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tools_path: default_tools_path(),
            execute_path: default_execute_path(),
            health_path: default_health_path(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            health_interval_ms: default_health_interval_ms(),
            health_timeout_ms: default_health_timeout_ms(),
            api_key: None,
        }
    }
}

/// Enablement and supported features for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Whether tools are exposed to this provider
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Features the deployment uses with this provider
    #[serde(default)]
    pub features: Vec<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            features: vec!["function_calling".to_string(), "streaming".to_string()],
        }
    }
}

/// Diagnostics verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Verbosity::Off => "off",
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiagnosticsConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default)]
    pub verbosity: Verbosity,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

/// Conversion cache and execution record limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cached (provider, catalog hash) batches
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Lifetime of a cached batch in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// How long finished execution records are kept, in seconds
    #[serde(default = "default_record_retention_secs")]
    pub record_retention_secs: u64,
    /// Hard cap on retained execution records
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl CacheConfig {
    /// Lifetime of a cached batch.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Retention window for finished execution records.
    pub fn record_retention(&self) -> Duration {
        Duration::from_secs(self.record_retention_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            record_retention_secs: default_record_retention_secs(),
            max_records: default_max_records(),
        }
    }
}

/// Streaming session limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Tool-execution rounds allowed within one turn before the dead switch trips
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
    /// Message sent to the model when the dead switch trips
    #[serde(default = "default_dead_switch_directive")]
    pub dead_switch_directive: String,
    /// Maximum tokens requested per generation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            dead_switch_directive: default_dead_switch_directive(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl BridgeConfiguration {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, the TOML is invalid, or
    /// validation fails.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(ConfigErrorKind::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)
            .map_err(|e| ConfigError::new(ConfigErrorKind::Parse(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = &self.host.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "host.base_url",
                format!("must be an http(s) URL, got '{}'", base_url),
            ));
        }
        if self.host.timeout_ms == 0 {
            return Err(ConfigError::invalid("host.timeout_ms", "must be greater than zero"));
        }
        if self.host.health_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "host.health_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.host.retries > 10 {
            return Err(ConfigError::invalid("host.retries", "must be at most 10"));
        }
        if self.host.retries > 0 {
            let last_delay = self
                .host
                .base_delay_ms
                .saturating_mul(1 << (self.host.retries - 1));
            if last_delay > self.host.max_delay_ms {
                return Err(ConfigError::invalid(
                    "host.max_delay_ms",
                    format!(
                        "must be at least base_delay_ms * 2^(retries - 1) = {}",
                        last_delay
                    ),
                ));
            }
        }
        if self.host.health_interval_ms < 100 {
            return Err(ConfigError::invalid("host.health_interval_ms", "must be at least 100"));
        }
        if self.cache.max_entries == 0 {
            return Err(ConfigError::invalid("cache.max_entries", "must be greater than zero"));
        }
        if self.session.max_tool_iterations == 0 {
            return Err(ConfigError::invalid(
                "session.max_tool_iterations",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Returns a new configuration with `patch` deep-merged over this one.
    ///
    /// The current value is left untouched; an invalid result is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolbridge_core::BridgeConfiguration;
    /// use serde_json::json;
    ///
    /// let config = BridgeConfiguration::default();
    /// let updated = config.merge(&json!({"host": {"retries": 5}})).unwrap();
    /// assert_eq!(updated.host.retries, 5);
    /// assert_eq!(updated.host.timeout_ms, config.host.timeout_ms);
    /// ```
    pub fn merge(&self, patch: &Value) -> Result<Self, ConfigError> {
        if !patch.is_object() {
            return Err(ConfigError::new(ConfigErrorKind::PatchNotObject));
        }
        let mut current = serde_json::to_value(self)
            .map_err(|e| ConfigError::new(ConfigErrorKind::Parse(e.to_string())))?;
        merge_json(&mut current, patch);
        let merged: Self = serde_json::from_value(current)
            .map_err(|e| ConfigError::new(ConfigErrorKind::Parse(e.to_string())))?;
        merged.validate()?;
        Ok(merged)
    }

    /// Whether tools should be exposed to a provider. Unlisted providers are enabled.
    pub fn is_provider_enabled(&self, provider: &str) -> bool {
        self.providers
            .get(provider)
            .map(|settings| settings.enabled)
            .unwrap_or(true)
    }
}

/// Deep-merge `patch` into `base`: objects merge key by key, everything else replaces.
pub fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(base_value) if base_value.is_object() && patch_value.is_object() => {
                        merge_json(base_value, patch_value);
                    }
                    _ => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

fn default_providers() -> BTreeMap<String, ProviderSettings> {
    ["openai", "anthropic", "gemini", "groq", "ollama"]
        .into_iter()
        .map(|provider| (provider.to_string(), ProviderSettings::default()))
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_tools_path() -> String {
    "/tools".to_string()
}

fn default_execute_path() -> String {
    "/tools/execute".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_health_interval_ms() -> u64 {
    30_000
}

fn default_health_timeout_ms() -> u64 {
    5_000
}

fn default_max_entries() -> usize {
    32
}

fn default_ttl_secs() -> u64 {
    3_600
}

fn default_record_retention_secs() -> u64 {
    600
}

fn default_max_records() -> usize {
    1_000
}

fn default_max_tool_iterations() -> u32 {
    15
}

fn default_dead_switch_directive() -> String {
    DEFAULT_DEAD_SWITCH_DIRECTIVE.to_string()
}

fn default_max_tokens() -> u32 {
    4096
}
