//! Conversions between the neutral transcript and the chat wire format.

use super::dto::{ChatChunk, ChatMessage, WireFunction, WireToolCall};
use crate::chunk::{StreamChunk, ToolCallFragment};
use serde_json::Value;
use toolbridge_core::{FinishReason, Message, Role, Usage};

/// Converts the transcript to chat messages.
///
/// Each tool result becomes its own `tool` message.
pub fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage> {
    let mut wire = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::System => wire.push(ChatMessage::text("system", message.text())),
            Role::User => wire.push(ChatMessage::text("user", message.text())),
            Role::Assistant => {
                let text = message.text();
                wire.push(ChatMessage {
                    role: "assistant".to_string(),
                    content: (!text.is_empty()).then_some(text),
                    tool_calls: message
                        .tool_calls()
                        .into_iter()
                        .map(|call| WireToolCall {
                            id: call.id.clone(),
                            kind: "function".to_string(),
                            function: WireFunction {
                                name: call.name.clone(),
                                arguments: arguments_text(&call.arguments),
                            },
                        })
                        .collect(),
                    tool_call_id: None,
                });
            }
            Role::Tool => {
                for result in message.tool_results() {
                    wire.push(ChatMessage {
                        role: "tool".to_string(),
                        content: Some(result.content.clone()),
                        tool_calls: Vec::new(),
                        tool_call_id: Some(result.call_id.clone()),
                    });
                }
            }
        }
    }
    wire
}

/// Arguments as the JSON string the API expects.
pub fn arguments_text(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

/// Converts one wire event to a neutral chunk.
///
/// Only the first choice is read.
pub fn to_stream_chunk(chunk: ChatChunk) -> StreamChunk {
    let mut out = StreamChunk {
        usage: chunk.usage.map(|usage| Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }),
        ..Default::default()
    };

    if let Some(choice) = chunk.choices.into_iter().next() {
        out.content = choice.delta.content;
        out.tool_call_fragments = choice
            .delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|delta| {
                let (name, arguments) = delta
                    .function
                    .map(|function| (function.name, function.arguments))
                    .unwrap_or_default();
                ToolCallFragment {
                    index: delta.index,
                    id: delta.id,
                    name,
                    arguments,
                }
            })
            .collect();
        out.finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_provider);
    }
    out
}
