//! Test utilities for session tests.
//!
//! Provides a scripted provider adapter, a recording dispatcher, and an echo
//! execution host for end-to-end runs through a real bridge.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use toolbridge_core::{FinishReason, SessionConfig, Tool, ToolCallRequest, ToolCallResult, Usage};
use toolbridge_error::{BridgeErrorKind, BridgeResult, SessionError, SessionErrorKind, SessionResult};
use toolbridge_executor::ToolHost;
use toolbridge_session::{
    AdapterRequest, ChunkStream, ProviderAdapter, StreamChunk, ToolCallFragment, ToolDispatcher,
};

/// One scripted reply from the fake provider.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Emit these chunks, then end the stream
    Chunks(Vec<StreamChunk>),
    /// Emit these chunks, then never end
    Hang(Vec<StreamChunk>),
    /// Fail before streaming
    Fail(SessionErrorKind),
}

/// [`ProviderAdapter`] replaying scripted replies and recording requests.
///
/// Queued replies are used first; once the queue is empty the fallback
/// repeats, and without a fallback a plain "ok" answer is sent.
#[derive(Debug)]
pub struct ScriptedAdapter {
    provider: String,
    queue: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Option<Reply>>,
    requests: Mutex<Vec<AdapterRequest>>,
}

impl ScriptedAdapter {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, reply: Reply) -> Self {
        self.push(reply);
        self
    }

    pub fn push(&self, reply: Reply) {
        self.queue.lock().unwrap().push_back(reply);
    }

    pub fn always(self, reply: Reply) -> Self {
        *self.fallback.lock().unwrap() = Some(reply);
        self
    }

    pub fn requests(&self) -> Vec<AdapterRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> AdapterRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn stream(&self, request: AdapterRequest) -> SessionResult<ChunkStream> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.lock().unwrap().clone())
            .unwrap_or_else(|| Reply::Chunks(text_reply("ok")));

        match reply {
            Reply::Chunks(chunks) => Ok(Box::pin(futures::stream::iter(
                chunks.into_iter().map(Ok::<_, SessionError>),
            ))),
            Reply::Hang(chunks) => Ok(Box::pin(
                futures::stream::iter(chunks.into_iter().map(Ok::<_, SessionError>)).chain(futures::stream::pending()),
            )),
            Reply::Fail(kind) => Err(SessionError::new(kind)),
        }
    }
}

/// A complete text answer.
pub fn text_reply(text: &str) -> Vec<StreamChunk> {
    vec![StreamChunk::text(text), StreamChunk::finished(FinishReason::Stop)]
}

/// One tool call streamed as a start fragment plus argument pieces, then finished.
pub fn tool_call_reply(id: &str, name: &str, pieces: &[&str]) -> Vec<StreamChunk> {
    let mut chunks = vec![StreamChunk::fragment(ToolCallFragment::start(0, id, name))];
    chunks.extend(
        pieces
            .iter()
            .map(|piece| StreamChunk::fragment(ToolCallFragment::arguments(0, *piece))),
    );
    chunks.push(StreamChunk::finished(FinishReason::ToolCalls));
    chunks
}

/// A usage-only chunk.
pub fn usage_chunk(input_tokens: u32, output_tokens: u32) -> StreamChunk {
    StreamChunk {
        usage: Some(Usage {
            input_tokens,
            output_tokens,
        }),
        ..Default::default()
    }
}

/// Session settings with the default limit and a short directive.
pub fn settings() -> SessionConfig {
    SessionConfig {
        max_tool_iterations: 15,
        dead_switch_directive: "Summarize and ask before continuing.".to_string(),
        max_tokens: 256,
    }
}

/// [`ToolDispatcher`] echoing arguments back and recording every request.
#[derive(Debug)]
pub struct RecordingDispatcher {
    definitions: Vec<Value>,
    batches: Mutex<Vec<Vec<ToolCallRequest>>>,
    hang: AtomicBool,
    saw_cancel: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            definitions: vec![json!({
                "type": "function",
                "function": {"name": "search", "parameters": {"type": "object"}}
            })],
            batches: Mutex::new(Vec::new()),
            hang: AtomicBool::new(false),
            saw_cancel: AtomicBool::new(false),
        }
    }

    /// Block every execution until the session cancels.
    pub fn hanging(self) -> Self {
        self.hang.store(true, Ordering::SeqCst);
        self
    }

    pub fn requests(&self) -> Vec<ToolCallRequest> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn saw_cancel(&self) -> bool {
        self.saw_cancel.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolDispatcher for RecordingDispatcher {
    fn tool_definitions(&self, _provider: &str) -> BridgeResult<Vec<Value>> {
        Ok(self.definitions.clone())
    }

    async fn execute_tools(
        &self,
        requests: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> BridgeResult<Vec<ToolCallResult>> {
        self.batches.lock().unwrap().push(requests.clone());
        if self.hang.load(Ordering::SeqCst) {
            cancel.cancelled().await;
            self.saw_cancel.store(true, Ordering::SeqCst);
            return Ok(requests
                .into_iter()
                .map(|r| {
                    ToolCallResult::from_error(r.id, &BridgeErrorKind::Cancelled, Duration::ZERO, 0)
                })
                .collect());
        }
        Ok(requests
            .into_iter()
            .map(|r| ToolCallResult::success(r.id, json!({"echo": r.parameters}), Duration::ZERO, 0))
            .collect())
    }
}

/// [`ToolHost`] serving a fixed catalog and echoing invocations.
#[derive(Debug)]
pub struct EchoHost {
    tools: Vec<Tool>,
    invocations: Mutex<Vec<(String, Value)>>,
}

impl EchoHost {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self {
            tools,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<(String, Value)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolHost for EchoHost {
    async fn list_tools(&self) -> BridgeResult<Vec<Tool>> {
        Ok(self.tools.clone())
    }

    async fn invoke(&self, name: &str, arguments: &Value) -> BridgeResult<Value> {
        self.invocations
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        Ok(json!({"tool": name, "arguments": arguments}))
    }

    async fn health(&self) -> BridgeResult<()> {
        Ok(())
    }
}
