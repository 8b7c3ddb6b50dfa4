//! String-keyed lookup of schema converters.

use crate::converter::SchemaConverter;
use crate::providers::{
    AnthropicConverter, GeminiConverter, GroqConverter, OllamaConverter, OpenAiConverter,
};
use std::collections::HashMap;
use std::sync::Arc;
use toolbridge_error::{BridgeError, BridgeErrorKind, BridgeResult};

/// Converters registered by provider key.
#[derive(Debug, Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn SchemaConverter>>,
}

impl ConverterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in converter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(OpenAiConverter);
        registry.register(AnthropicConverter);
        registry.register(GeminiConverter);
        registry.register(GroqConverter);
        registry.register(OllamaConverter);
        registry
    }

    /// Registers a converter under its provider key, replacing any previous one.
    pub fn register<C: SchemaConverter + 'static>(&mut self, converter: C) {
        tracing::debug!(provider = converter.provider(), "Registering schema converter");
        self.converters
            .insert(converter.provider().to_string(), Arc::new(converter));
    }

    /// Looks up the converter for `provider`.
    pub fn get(&self, provider: &str) -> BridgeResult<Arc<dyn SchemaConverter>> {
        self.converters
            .get(provider)
            .cloned()
            .ok_or_else(|| BridgeError::new(BridgeErrorKind::ProviderNotSupported(provider.to_string())))
    }

    /// Whether a converter is registered for `provider`.
    pub fn contains(&self, provider: &str) -> bool {
        self.converters.contains_key(provider)
    }

    /// Registered provider keys, sorted.
    pub fn providers(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}
