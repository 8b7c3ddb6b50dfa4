//! Groq function calling schema conversion (OpenAI format).

use crate::converter::{NameRules, ProviderCapabilities, SchemaConverter};
use crate::providers::OpenAiToolSchema;
use toolbridge_core::{ProviderTool, Tool};
use toolbridge_error::BridgeResult;

/// Converter for Groq's OpenAI-compatible API.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroqConverter;

impl SchemaConverter for GroqConverter {
    fn provider(&self) -> &'static str {
        "groq"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::new(&["function_calling", "parallel_tool_calls", "streaming"], NameRules::STANDARD.max_len, 1024)
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
