//! The streaming conversation loop.
//!
//! A [`SessionController`] owns one conversation. Each turn streams a model
//! response, executes any tool calls through a [`ToolDispatcher`], feeds the
//! results back, and generates again until the model answers without calling
//! tools. After `max_tool_iterations` rounds the tools are withheld and the
//! model is asked to summarize and wait for the user.

use crate::accumulator::{AssembledCall, ToolCallAccumulator};
use crate::adapter::{AdapterRequest, ProviderAdapter, ToolChoice};
use crate::dispatch::ToolDispatcher;
use derive_getters::Getters;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use toolbridge_core::{
    FinishReason, Message, Part, Role, SessionConfig, ToolCallPart, ToolCallRequest,
    ToolCallResult, ToolErrorKind, Usage,
};
use toolbridge_error::{SessionError, SessionErrorKind, SessionResult};
use tracing::{debug, info, instrument, warn};

/// User message sent by [`SessionController::resume`] when the caller gives none.
pub const DEFAULT_CONTINUE_PROMPT: &str = "Please continue.";

/// Where a session is within its current turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No turn has run yet, or the last one failed
    #[default]
    #[display("idle")]
    Idle,
    /// Streaming a model response
    #[display("generating")]
    Generating,
    /// The response ended with tool calls
    #[display("tool_calls_detected")]
    ToolCallsDetected,
    /// Waiting for the bridge to execute calls
    #[display("awaiting_tool_execution")]
    AwaitingToolExecution,
    /// Results appended, about to generate again
    #[display("continuing")]
    Continuing,
    /// Iteration limit reached; asking the model to summarize
    #[display("dead_switch")]
    DeadSwitch,
    /// Waiting for the user before tools are offered again
    #[display("awaiting_user_confirmation")]
    AwaitingUserConfirmation,
    /// The model answered without calling tools
    #[display("done")]
    Done,
    /// The turn was cancelled
    #[display("cancelled")]
    Cancelled,
}

impl SessionState {
    /// Whether the session is between tool detection and the next generation.
    pub fn is_tool_execution(&self) -> bool {
        matches!(
            self,
            SessionState::ToolCallsDetected
                | SessionState::AwaitingToolExecution
                | SessionState::Continuing
        )
    }
}

/// Progress reported while a turn runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Incremental model text
    TextDelta(String),
    /// The session moved between states
    StateChanged {
        /// Previous state
        from: SessionState,
        /// New state
        to: SessionState,
    },
    /// The model requested these calls
    ToolCallsDetected(Vec<ToolCallPart>),
    /// One call finished
    ToolResult(ToolCallResult),
    /// The iteration limit was reached
    DeadSwitchTriggered {
        /// Tool rounds completed in this turn
        iterations: u32,
    },
    /// Token usage reported by the provider
    Usage(Usage),
}

/// Summary of a finished turn.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct TurnOutcome {
    /// `Done`, `AwaitingUserConfirmation`, or `Cancelled`
    final_state: SessionState,
    /// All model text produced during the turn
    text: String,
    /// Tool rounds executed
    iterations: u32,
    /// Tokens used across every generation in the turn
    usage: Usage,
}

#[derive(Debug)]
struct Generation {
    text: String,
    calls: Vec<AssembledCall>,
    finish_reason: Option<FinishReason>,
}

/// Drives one conversation against one provider.
#[derive(Debug)]
pub struct SessionController {
    id: String,
    adapter: Arc<dyn ProviderAdapter>,
    dispatcher: Arc<dyn ToolDispatcher>,
    settings: SessionConfig,
    transcript: Vec<Message>,
    state: SessionState,
    iterations: u32,
    usage: Usage,
    cancel: CancellationToken,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl SessionController {
    /// Creates a controller with an empty transcript.
    pub fn new(
        adapter: Arc<dyn ProviderAdapter>,
        dispatcher: Arc<dyn ToolDispatcher>,
        settings: SessionConfig,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            adapter,
            dispatcher,
            settings,
            transcript: Vec::new(),
            state: SessionState::Idle,
            iterations: 0,
            usage: Usage::default(),
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    /// Sends [`SessionEvent`]s to `sender`. A dropped receiver is ignored.
    pub fn with_events(mut self, sender: UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Starts the transcript with a system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.transcript.push(Message::system(prompt));
        self
    }

    /// Session id attached to every tool call.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Tool rounds executed in the current turn.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// The conversation so far.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Token that cancels the running turn.
    ///
    /// Take it before starting a turn to cancel from another task. A token that
    /// has fired is replaced when the next turn starts.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the running turn and any tool calls it started.
    pub fn cancel(&self) {
        info!(session_id = %self.id, "Cancelling session");
        self.cancel.cancel();
    }

    /// Runs one turn starting from `input`.
    ///
    /// Fails with [`SessionErrorKind::InvalidState`] while the session awaits
    /// user confirmation; use [`resume`](Self::resume) there.
    #[instrument(skip(self, input), fields(session_id = %self.id, provider = self.adapter.provider()))]
    pub async fn run_turn(&mut self, input: impl Into<String>) -> SessionResult<TurnOutcome> {
        if self.state == SessionState::AwaitingUserConfirmation {
            return Err(SessionError::new(SessionErrorKind::InvalidState(
                "awaiting user confirmation; call resume".to_string(),
            )));
        }
        self.begin_turn(input.into());
        self.drive().await
    }

    /// Continues after the dead switch, with tools available again.
    ///
    /// The iteration count starts over. Without `input` a short continuation
    /// prompt is sent.
    #[instrument(skip(self, input), fields(session_id = %self.id, provider = self.adapter.provider()))]
    pub async fn resume(&mut self, input: Option<String>) -> SessionResult<TurnOutcome> {
        if self.state != SessionState::AwaitingUserConfirmation {
            return Err(SessionError::new(SessionErrorKind::InvalidState(format!(
                "cannot resume from '{}'",
                self.state
            ))));
        }
        info!("Resuming after user confirmation");
        self.begin_turn(input.unwrap_or_else(|| DEFAULT_CONTINUE_PROMPT.to_string()));
        self.drive().await
    }

    fn begin_turn(&mut self, input: String) {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.iterations = 0;
        self.usage = Usage::default();
        self.transcript.push(Message::user(input));
    }

    async fn drive(&mut self) -> SessionResult<TurnOutcome> {
        let mut text = String::new();
        match self.drive_turn(&mut text).await {
            Ok(state) => Ok(self.outcome(state, text)),
            Err(err) if err.is_cancelled() => {
                self.transition(SessionState::Cancelled);
                Ok(self.outcome(SessionState::Cancelled, text))
            }
            Err(err) => {
                warn!(error = %err.kind(), state = %self.state, "Turn failed");
                self.transition(SessionState::Idle);
                Err(err)
            }
        }
    }

    fn outcome(&self, final_state: SessionState, text: String) -> TurnOutcome {
        TurnOutcome {
            final_state,
            text,
            iterations: self.iterations,
            usage: self.usage,
        }
    }

    async fn drive_turn(&mut self, text: &mut String) -> SessionResult<SessionState> {
        let tools = self.dispatcher.tool_definitions(self.adapter.provider())?;
        debug!(tool_count = tools.len(), "Loaded tool definitions");

        loop {
            self.transition(SessionState::Generating);
            let generation = self
                .generate(AdapterRequest {
                    messages: self.transcript.clone(),
                    tools: tools.clone(),
                    tool_choice: ToolChoice::Auto,
                    max_tokens: self.settings.max_tokens,
                })
                .await?;
            text.push_str(&generation.text);

            if generation.calls.is_empty() {
                if !generation.text.is_empty() {
                    self.transcript.push(Message::assistant(generation.text));
                }
                debug!(finish_reason = ?generation.finish_reason, "Model answered without tools");
                self.transition(SessionState::Done);
                return Ok(SessionState::Done);
            }

            self.transition(SessionState::ToolCallsDetected);
            let parts: Vec<ToolCallPart> = generation
                .calls
                .iter()
                .map(|call| ToolCallPart {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.transcript_arguments(),
                })
                .collect();
            info!(count = parts.len(), iteration = self.iterations + 1, "Tool calls detected");
            self.emit(SessionEvent::ToolCallsDetected(parts.clone()));

            self.transition(SessionState::AwaitingToolExecution);
            let results = self.execute_calls(&generation.calls).await?;

            let mut assistant = Vec::with_capacity(parts.len() + 1);
            if !generation.text.is_empty() {
                assistant.push(Part::text(generation.text));
            }
            assistant.extend(parts.iter().cloned().map(Part::ToolCall));
            self.transcript
                .push(Message::from_parts(Role::Assistant, assistant));
            for (call, result) in parts.iter().zip(results) {
                self.transcript
                    .push(self.adapter.tool_result_message(call, &result));
                self.emit(SessionEvent::ToolResult(result));
            }

            self.iterations += 1;
            self.transition(SessionState::Continuing);

            if self.iterations >= self.settings.max_tool_iterations {
                return self.dead_switch(tools, text).await;
            }
        }
    }

    /// Forbids further tool calls and asks the model to summarize.
    ///
    /// Definitions stay attached: a request whose transcript holds tool call
    /// or result blocks is rejected by Anthropic when it defines no tools.
    async fn dead_switch(
        &mut self,
        tools: Vec<Value>,
        text: &mut String,
    ) -> SessionResult<SessionState> {
        warn!(iterations = self.iterations, "Tool iteration limit reached, forbidding tool calls");
        self.transition(SessionState::DeadSwitch);
        self.emit(SessionEvent::DeadSwitchTriggered {
            iterations: self.iterations,
        });

        let mut messages = self.transcript.clone();
        messages.push(Message::system(self.settings.dead_switch_directive.clone()));
        let generation = self
            .generate(AdapterRequest {
                messages,
                tools,
                tool_choice: ToolChoice::None,
                max_tokens: self.settings.max_tokens,
            })
            .await?;

        if !generation.calls.is_empty() {
            warn!(count = generation.calls.len(), "Ignoring tool calls requested after the dead switch");
        }
        text.push_str(&generation.text);
        if !generation.text.is_empty() {
            self.transcript.push(Message::assistant(generation.text));
        }

        self.transition(SessionState::AwaitingUserConfirmation);
        Ok(SessionState::AwaitingUserConfirmation)
    }

    /// Streams one response and assembles its tool calls.
    async fn generate(&mut self, request: AdapterRequest) -> SessionResult<Generation> {
        let cancel = self.cancel.clone();
        debug!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Starting generation"
        );

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::new(SessionErrorKind::Cancelled)),
            stream = self.adapter.stream(request) => stream?,
        };

        let mut accumulator = ToolCallAccumulator::new();
        let mut text = String::new();
        let mut finish_reason = None;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SessionError::new(SessionErrorKind::Cancelled)),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk?;

            if let Some(delta) = chunk.content.filter(|delta| !delta.is_empty()) {
                text.push_str(&delta);
                self.emit(SessionEvent::TextDelta(delta));
            }
            for fragment in chunk.tool_call_fragments {
                accumulator.push(fragment);
            }
            if let Some(usage) = chunk.usage {
                self.usage.add(usage);
                self.emit(SessionEvent::Usage(usage));
            }
            if let Some(reason) = chunk.finish_reason {
                finish_reason = Some(reason);
            }
        }

        if !accumulator.is_empty() && finish_reason.is_none() {
            return Err(SessionError::new(SessionErrorKind::IncompleteToolCall(
                accumulator.pending_names().join(", "),
            )));
        }

        Ok(Generation {
            text,
            calls: accumulator.finish(),
            finish_reason,
        })
    }

    /// Executes the parseable calls in parallel; unparseable ones fail without running.
    ///
    /// Results come back in call order.
    async fn execute_calls(&self, calls: &[AssembledCall]) -> SessionResult<Vec<ToolCallResult>> {
        let provider = self.adapter.provider();
        let mut results: HashMap<String, ToolCallResult> = HashMap::with_capacity(calls.len());
        let mut requests = Vec::with_capacity(calls.len());

        for call in calls {
            match &call.arguments {
                Ok(arguments) => requests.push(
                    ToolCallRequest::new(&call.id, &call.name, arguments.clone(), provider)
                        .with_session(&self.id),
                ),
                Err(reason) => {
                    results.insert(
                        call.id.clone(),
                        ToolCallResult::failure(
                            &call.id,
                            ToolErrorKind::ParameterValidation,
                            format!("Parameter validation failed: arguments are not valid JSON: {}", reason),
                            Duration::ZERO,
                            0,
                        ),
                    );
                }
            }
        }

        if !requests.is_empty() {
            for result in self
                .dispatcher
                .execute_tools(requests, &self.cancel)
                .await?
            {
                results.insert(result.id.clone(), result);
            }
        }
        if self.cancel.is_cancelled() {
            return Err(SessionError::new(SessionErrorKind::Cancelled));
        }

        Ok(calls
            .iter()
            .map(|call| {
                results.remove(&call.id).unwrap_or_else(|| {
                    ToolCallResult::failure(
                        &call.id,
                        ToolErrorKind::ToolExecution,
                        "no result returned for call",
                        Duration::ZERO,
                        0,
                    )
                })
            })
            .collect())
    }

    fn transition(&mut self, to: SessionState) {
        if self.state == to {
            return;
        }
        debug!(from = %self.state, to = %to, "Session state changed");
        let from = std::mem::replace(&mut self.state, to);
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(sender) = &self.events
            && sender.send(event).is_err()
        {
            debug!("Session event receiver dropped");
        }
    }
}
