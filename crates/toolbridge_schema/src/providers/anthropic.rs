//! Anthropic tool schema conversion.

use crate::converter::{NameRules, PreparedTool, ProviderCapabilities, SchemaConverter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbridge_core::{ProviderTool, Tool};
use toolbridge_error::BridgeResult;

/// Anthropic-specific tool schema format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicToolSchema {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Input schema
    pub input_schema: Value,
}

impl From<PreparedTool> for AnthropicToolSchema {
    fn from(prepared: PreparedTool) -> Self {
        Self {
            name: prepared.name,
            description: prepared.description,
            input_schema: prepared.schema,
        }
    }
}

/// Converter for the Anthropic messages API.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicConverter;

impl SchemaConverter for AnthropicConverter {
    fn provider(&self) -> &'static str {
        "anthropic"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::new(
            &["function_calling", "parallel_tool_calls", "streaming"],
            NameRules::STANDARD.max_len,
            1024,
        )
    }

    fn name_rules(&self) -> NameRules {
        NameRules::STANDARD
    }

    fn name_pointer(&self) -> &'static str {
        "/name"
    }

    fn description_pointer(&self) -> &'static str {
        "/description"
    }

    fn schema_pointer(&self) -> &'static str {
        "/input_schema"
    }

    fn convert(&self, tool: &Tool) -> BridgeResult<ProviderTool> {
        let prepared = self.prepare(tool)?;
        let name = prepared.name.clone();
        self.finish(tool, name, &AnthropicToolSchema::from(prepared))
    }
}
