//! Canonical tools and provider-shaped tool definitions.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A named, schema-described operation exposed by the execution host.
///
/// # Examples
///
/// ```
/// use toolbridge_core::Tool;
/// use serde_json::json;
///
/// let tool = Tool::new("search", "Search the vault", json!({"type": "object", "properties": {}}));
/// assert_eq!(tool.name(), "search");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Tool {
    /// Unique, stable identifier
    name: String,
    /// Human and model readable description
    #[serde(default)]
    description: String,
    /// JSON schema describing the parameters
    #[serde(rename = "inputSchema", alias = "parameterSchema", default)]
    parameter_schema: Value,
}

impl Tool {
    /// Creates a new tool.
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameter_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema,
        }
    }

    /// Names of the parameters listed under the schema's `required` array.
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameter_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|required| required.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// One [`Tool`] rendered in one provider's function-calling dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct ProviderTool {
    /// Provider key (e.g. "openai")
    provider: String,
    /// Name of the canonical tool this was derived from
    original_name: String,
    /// Name as the provider will see it, after sanitization
    native_name: String,
    /// Provider-shaped definition sent on the wire
    native_definition: Value,
}

impl ProviderTool {
    /// Creates a new provider tool.
    pub fn new(
        provider: impl Into<String>,
        original_name: impl Into<String>,
        native_name: impl Into<String>,
        native_definition: Value,
    ) -> Self {
        Self {
            provider: provider.into(),
            original_name: original_name.into(),
            native_name: native_name.into(),
            native_definition,
        }
    }

    /// Replaces the native name and definition, used to resolve name collisions.
    pub fn with_native(mut self, native_name: String, native_definition: Value) -> Self {
        self.native_name = native_name;
        self.native_definition = native_definition;
        self
    }
}

/// Content hash of a tool set, used to detect catalog changes.
///
/// Hashes the sorted `name:description` lines, so the result does not depend
/// on the order tools were listed in.
///
/// # Examples
///
/// ```
/// use toolbridge_core::{Tool, catalog_hash};
/// use serde_json::json;
///
/// let a = Tool::new("search", "Search", json!({}));
/// let b = Tool::new("createFile", "Create", json!({}));
/// assert_eq!(catalog_hash(&[a.clone(), b.clone()]), catalog_hash(&[b, a]));
/// ```
pub fn catalog_hash(tools: &[Tool]) -> String {
    let mut lines: Vec<String> = tools
        .iter()
        .map(|tool| format!("{}:{}", tool.name, tool.description))
        .collect();
    lines.sort();

    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
