//! Adapter for OpenAI-compatible chat completion APIs (OpenAI, Groq, Ollama).

mod conversions;
mod dto;

use super::sse::SseDecoder;
use crate::adapter::{AdapterRequest, ProviderAdapter};
use crate::chunk::{ChunkStream, StreamChunk};
use conversions::{to_chat_messages, to_stream_chunk};
use dto::{ChatChunk, ChatRequest, StreamOptions};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde_json::json;
use toolbridge_error::{SessionError, SessionErrorKind, SessionResult};
use tracing::{debug, error, instrument};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Streams chat completions from any OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatAdapter {
    client: Client,
    provider: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    include_usage: bool,
}

impl OpenAiCompatAdapter {
    /// Creates an adapter for `provider` at `base_url` (the part before `/chat/completions`).
    pub fn new(
        provider: impl AsRef<str>,
        base_url: impl AsRef<str>,
        model: impl AsRef<str>,
        api_key: Option<String>,
    ) -> Self {
        debug!(
            provider = provider.as_ref(),
            model = model.as_ref(),
            url = base_url.as_ref(),
            "Created OpenAI-compatible adapter"
        );
        Self {
            client: Client::new(),
            provider: provider.as_ref().to_string(),
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            model: model.as_ref().to_string(),
            api_key,
            include_usage: false,
        }
    }

    /// OpenAI's hosted API, with usage reporting on.
    pub fn openai(api_key: impl Into<String>, model: impl AsRef<str>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, model, Some(api_key.into())).with_usage(true)
    }

    /// Groq's OpenAI-compatible API.
    pub fn groq(api_key: impl Into<String>, model: impl AsRef<str>) -> Self {
        Self::new("groq", GROQ_BASE_URL, model, Some(api_key.into()))
    }

    /// A local Ollama server.
    pub fn ollama(model: impl AsRef<str>) -> Self {
        Self::new("ollama", OLLAMA_BASE_URL, model, None)
    }

    /// Requests a trailing usage chunk (`stream_options.include_usage`).
    pub fn with_usage(mut self, include_usage: bool) -> Self {
        self.include_usage = include_usage;
        self
    }

    /// Model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, request: AdapterRequest) -> SessionResult<ChatRequest> {
        let mut builder = ChatRequest::builder();
        if request.forbids_tool_calls() {
            builder.tool_choice(json!("none"));
        }
        builder
            .model(self.model.clone())
            .messages(to_chat_messages(&request.messages))
            .tools(request.tools)
            .max_tokens(request.max_tokens);
        if self.include_usage {
            builder.stream_options(StreamOptions {
                include_usage: true,
            });
        }
        builder
            .build()
            .map_err(|e| SessionError::new(SessionErrorKind::InvalidRequest(e.to_string())))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatAdapter {
    fn provider(&self) -> &str {
        &self.provider
    }

    #[instrument(skip(self, request), fields(provider = %self.provider, model = %self.model))]
    async fn stream(&self, request: AdapterRequest) -> SessionResult<ChunkStream> {
        let body = self.build_request(request)?;
        debug!(
            message_count = body.messages().len(),
            tool_count = body.tools().len(),
            "Sending streaming request"
        );

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|e| {
            error!(provider = %self.provider, error = ?e, "HTTP request failed");
            SessionError::new(SessionErrorKind::Transport {
                provider: self.provider.clone(),
                message: e.to_string(),
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(provider = %self.provider, status = %status, error = %message, "API error");
            return Err(SessionError::new(SessionErrorKind::Api {
                provider: self.provider.clone(),
                status: status.as_u16(),
                message,
            }));
        }

        Ok(Box::pin(decode_stream(self.provider.clone(), response)))
    }
}

fn decode_stream(
    provider: String,
    response: Response,
) -> impl Stream<Item = SessionResult<StreamChunk>> + Send {
    try_stream! {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut done = false;

        while !done {
            let Some(bytes) = body.next().await else { break };
            let bytes = bytes.map_err(|e| {
                SessionError::new(SessionErrorKind::Transport {
                    provider: provider.clone(),
                    message: e.to_string(),
                })
            })?;

            for payload in decoder.push(&bytes) {
                if payload == "[DONE]" {
                    done = true;
                    break;
                }
                let chunk = parse_chunk(&provider, &payload)?;
                if !chunk.is_empty() {
                    yield chunk;
                }
            }
        }

        if !done
            && let Some(payload) = decoder.finish().filter(|p| p != "[DONE]")
        {
            let chunk = parse_chunk(&provider, &payload)?;
            if !chunk.is_empty() {
                yield chunk;
            }
        }
    }
}

fn parse_chunk(provider: &str, payload: &str) -> SessionResult<StreamChunk> {
    let chunk: ChatChunk = serde_json::from_str(payload).map_err(|e| {
        error!(provider, error = %e, "Failed to parse stream event");
        SessionError::new(SessionErrorKind::MalformedStream {
            provider: provider.to_string(),
            message: e.to_string(),
        })
    })?;
    Ok(to_stream_chunk(chunk))
}
