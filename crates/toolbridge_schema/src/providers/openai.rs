//! OpenAI function calling schema conversion.

use crate::converter::{NameRules, PreparedTool, ProviderCapabilities, SchemaConverter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbridge_core::{ProviderTool, Tool};
use toolbridge_error::BridgeResult;

/// OpenAI function schema format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiToolSchema {
    /// Type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: OpenAiFunction,
}

/// OpenAI function definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiFunction {
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// Parameters schema
    pub parameters: Value,
}

impl From<PreparedTool> for OpenAiToolSchema {
    fn from(prepared: PreparedTool) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: OpenAiFunction {
                name: prepared.name,
                description: prepared.description,
                parameters: prepared.schema,
            },
        }
    }
}

/// Converter for the OpenAI chat completions API.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiConverter;

impl SchemaConverter for OpenAiConverter {
    fn provider(&self) -> &'static str {
        "openai"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::new(
            &["function_calling", "parallel_tool_calls", "streaming", "strict_schema"],
            NameRules::STANDARD.max_len,
            1024,
        )
    }

    fn name_rules(&self) -> NameRules {
        NameRules::STANDARD
    }

    fn name_pointer(&self) -> &'static str {
        "/function/name"
    }

    fn description_pointer(&self) -> &'static str {
        "/function/description"
    }

    fn schema_pointer(&self) -> &'static str {
        "/function/parameters"
    }

    fn convert(&self, tool: &Tool) -> BridgeResult<ProviderTool> {
        let prepared = self.prepare(tool)?;
        let name = prepared.name.clone();
        self.finish(tool, name, &OpenAiToolSchema::from(prepared))
    }
}
