//! Adapter for the Anthropic Messages API.

mod conversions;
mod dto;

use super::sse::SseDecoder;
use crate::adapter::{AdapterRequest, ProviderAdapter};
use crate::chunk::{ChunkStream, StreamChunk};
use async_stream::try_stream;
use async_trait::async_trait;
use conversions::{EventOutcome, to_anthropic_messages, to_event_outcome};
use dto::{AnthropicRequest, StreamEvent};
use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use serde_json::json;
use toolbridge_error::{SessionError, SessionErrorKind, SessionResult};
use tracing::{debug, error, instrument};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Value sent in the `anthropic-version` header.
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Streams responses from the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl AnthropicAdapter {
    /// Creates an adapter for Anthropic's hosted API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, ANTHROPIC_BASE_URL)
    }

    /// Creates an adapter against a different host (proxies, tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl AsRef<str>,
    ) -> Self {
        let model = model.into();
        debug!(model = %model, url = base_url.as_ref(), "Created Anthropic adapter");
        Self {
            client: Client::new(),
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            model,
            api_key: api_key.into(),
        }
    }

    /// Model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: AdapterRequest) -> SessionResult<AnthropicRequest> {
        let (system, messages) = to_anthropic_messages(&request.messages);
        let tool_choice = request
            .forbids_tool_calls()
            .then(|| json!({"type": "none"}));
        AnthropicRequest::builder()
            .model(self.model.clone())
            .messages(messages)
            .max_tokens(request.max_tokens)
            .system(system)
            .tool_choice(tool_choice)
            .tools(request.tools)
            .build()
            .map_err(|e| SessionError::new(SessionErrorKind::InvalidRequest(e.to_string())))
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(provider = "anthropic", model = %self.model))]
    async fn stream(&self, request: AdapterRequest) -> SessionResult<ChunkStream> {
        let body = self.build_request(request)?;
        debug!(
            message_count = body.messages().len(),
            tool_count = body.tools().len(),
            "Sending streaming request"
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "HTTP request failed");
                SessionError::new(SessionErrorKind::Transport {
                    provider: "anthropic".to_string(),
                    message: e.to_string(),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, error = %message, "API error");
            return Err(SessionError::new(SessionErrorKind::Api {
                provider: "anthropic".to_string(),
                status: status.as_u16(),
                message,
            }));
        }

        Ok(Box::pin(decode_stream(response)))
    }
}

fn decode_stream(response: Response) -> impl Stream<Item = SessionResult<StreamChunk>> + Send {
    try_stream! {
        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut stopped = false;

        while !stopped {
            let Some(bytes) = body.next().await else { break };
            let bytes = bytes.map_err(|e| {
                SessionError::new(SessionErrorKind::Transport {
                    provider: "anthropic".to_string(),
                    message: e.to_string(),
                })
            })?;

            for payload in decoder.push(&bytes) {
                match parse_event(&payload)? {
                    EventOutcome::Chunk(chunk) => {
                        yield chunk;
                    }
                    EventOutcome::Skip => {}
                    EventOutcome::Stop => {
                        stopped = true;
                        break;
                    }
                    EventOutcome::Failed(message) => {
                        error!(error = %message, "Stream aborted by server");
                        Err::<(), _>(SessionError::new(SessionErrorKind::StreamAborted {
                            provider: "anthropic".to_string(),
                            message,
                        }))?;
                    }
                }
            }
        }
    }
}

fn parse_event(payload: &str) -> SessionResult<EventOutcome> {
    let event: StreamEvent = serde_json::from_str(payload).map_err(|e| {
        error!(error = %e, "Failed to parse stream event");
        SessionError::new(SessionErrorKind::MalformedStream {
            provider: "anthropic".to_string(),
            message: e.to_string(),
        })
    })?;
    Ok(to_event_outcome(event))
}
