//! Gemini function calling schema conversion.

use crate::converter::{NameRules, PreparedTool, ProviderCapabilities, SchemaConverter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbridge_core::{ProviderTool, Tool};
use toolbridge_error::BridgeResult;

/// JSON schema keywords Gemini's OpenAPI subset rejects.
pub const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "$schema",
    "additionalProperties",
    "$ref",
    "$defs",
    "default",
    "examples",
];

/// Gemini function declaration format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiToolSchema {
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// Parameters schema
    pub parameters: Value,
}

impl From<PreparedTool> for GeminiToolSchema {
    fn from(mut prepared: PreparedTool) -> Self {
        strip_unsupported_keywords(&mut prepared.schema);
        Self {
            name: prepared.name,
            description: prepared.description,
            parameters: prepared.schema,
        }
    }
}

/// Removes [`UNSUPPORTED_KEYWORDS`] from a schema and every nested subschema.
///
/// Property names are left alone, so a parameter called `default` survives.
pub fn strip_unsupported_keywords(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };
    for keyword in UNSUPPORTED_KEYWORDS {
        map.remove(*keyword);
    }

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        properties.values_mut().for_each(strip_unsupported_keywords);
    }
    match map.get_mut("items") {
        Some(Value::Array(items)) => items.iter_mut().for_each(strip_unsupported_keywords),
        Some(items) => strip_unsupported_keywords(items),
        None => {}
    }
    for combinator in ["anyOf", "oneOf", "allOf"] {
        if let Some(Value::Array(variants)) = map.get_mut(combinator) {
            variants.iter_mut().for_each(strip_unsupported_keywords);
        }
    }
}

/// Converter for the Gemini API.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiConverter;

impl SchemaConverter for GeminiConverter {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::new(
            &["function_calling", "parallel_tool_calls", "streaming"],
            NameRules::GEMINI.max_len,
            1024,
        )
    }

    fn name_rules(&self) -> NameRules {
        NameRules::GEMINI
    }

    fn name_pointer(&self) -> &'static str {
        "/name"
    }

    fn description_pointer(&self) -> &'static str {
        "/description"
    }

    fn schema_pointer(&self) -> &'static str {
        "/parameters"
    }

    fn convert(&self, tool: &Tool) -> BridgeResult<ProviderTool> {
        let prepared = self.prepare(tool)?;
        let name = prepared.name.clone();
        self.finish(tool, name, &GeminiToolSchema::from(prepared))
    }
}
