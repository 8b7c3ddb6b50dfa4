//! Converters for each supported provider dialect.

mod anthropic;
mod gemini;
mod groq;
mod ollama;
mod openai;

pub use anthropic::{AnthropicConverter, AnthropicToolSchema};
pub use gemini::{GeminiConverter, GeminiToolSchema, UNSUPPORTED_KEYWORDS, strip_unsupported_keywords};
pub use groq::GroqConverter;
pub use ollama::OllamaConverter;
pub use openai::{OpenAiConverter, OpenAiFunction, OpenAiToolSchema};
