//! Ollama function calling schema conversion (OpenAI format).

use crate::converter::{NameRules, ProviderCapabilities, SchemaConverter};
use crate::providers::OpenAiToolSchema;
use toolbridge_core::{ProviderTool, Tool};
use toolbridge_error::BridgeResult;

/// Converter for Ollama's OpenAI-compatible chat API.
#[derive(Debug, Clone, Copy, Default)]
pub struct OllamaConverter;

impl SchemaConverter for OllamaConverter {
    fn provider(&self) -> &'static str {
        "ollama"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::new(&["function_calling", "streaming"], NameRules::STANDARD.max_len, 1024)
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
