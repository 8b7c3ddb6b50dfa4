//! Streaming adapters for concrete provider APIs.

mod anthropic;
mod openai_compat;
mod sse;

pub use anthropic::{ANTHROPIC_API_VERSION, AnthropicAdapter};
pub use openai_compat::OpenAiCompatAdapter;
pub use sse::SseDecoder;
