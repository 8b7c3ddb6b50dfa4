//! Tool schema conversion for different LLM providers.
//!
//! Each provider speaks its own function-calling dialect. A [`SchemaConverter`]
//! renders canonical [`toolbridge_core::Tool`]s into one dialect, the
//! [`ConverterRegistry`] selects converters by provider key, and the
//! [`ToolConverter`] converts whole catalogs with caching keyed by catalog hash.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod converter;
mod orchestrator;
mod providers;
mod registry;

pub use cache::{CacheStats, ConversionCache, ConversionCacheEntry, ConversionFailure};
pub use converter::{
    ELLIPSIS, FALLBACK_NAME, NameRules, PreparedTool, ProviderCapabilities, SchemaConverter,
    ValidationReport, is_complete_object_schema, normalize_schema, truncate_description,
};
pub use orchestrator::{ConversionReport, ToolConverter};
pub use providers::{
    AnthropicConverter, AnthropicToolSchema, GeminiConverter, GeminiToolSchema, GroqConverter,
    OllamaConverter, OpenAiConverter, OpenAiFunction, OpenAiToolSchema, UNSUPPORTED_KEYWORDS,
    strip_unsupported_keywords,
};
pub use registry::ConverterRegistry;
