//! Conversions between the neutral transcript and the Messages wire format.

use super::dto::{AnthropicMessage, BlockDelta, BlockStart, ContentBlock, StreamEvent};
use crate::chunk::{StreamChunk, ToolCallFragment};
use serde_json::{Map, Value};
use toolbridge_core::{FinishReason, Message, Part, Role, Usage};

/// Splits the transcript into a system prompt and API messages.
///
/// System messages are joined into the top-level prompt. Tool results travel
/// in user messages, and consecutive messages with the same role are merged
/// because the API requires strict alternation.
pub fn to_anthropic_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system = Vec::new();
    let mut wire: Vec<AnthropicMessage> = Vec::new();

    for message in messages {
        let (role, blocks) = match message.role {
            Role::System => {
                system.push(message.text());
                continue;
            }
            Role::User => ("user", text_blocks(message)),
            Role::Assistant => ("assistant", assistant_blocks(message)),
            Role::Tool => ("user", result_blocks(message)),
        };
        if blocks.is_empty() {
            continue;
        }
        match wire.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => wire.push(AnthropicMessage {
                role: role.to_string(),
                content: blocks,
            }),
        }
    }

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, wire)
}

fn text_blocks(message: &Message) -> Vec<ContentBlock> {
    let text = message.text();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![ContentBlock::Text { text }]
    }
}

fn assistant_blocks(message: &Message) -> Vec<ContentBlock> {
    message
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text } if !text.is_empty() => Some(ContentBlock::Text { text: text.clone() }),
            Part::ToolCall(call) => Some(ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: if call.arguments.is_object() {
                    call.arguments.clone()
                } else {
                    Value::Object(Map::new())
                },
            }),
            _ => None,
        })
        .collect()
}

fn result_blocks(message: &Message) -> Vec<ContentBlock> {
    message
        .tool_results()
        .into_iter()
        .map(|result| ContentBlock::ToolResult {
            tool_use_id: result.call_id.clone(),
            content: result.content.clone(),
            is_error: result.is_error,
        })
        .collect()
}

/// What a stream event means for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Forward this chunk
    Chunk(StreamChunk),
    /// Nothing to forward
    Skip,
    /// The message is complete
    Stop,
    /// The server reported an error
    Failed(String),
}

/// Converts one stream event.
pub fn to_event_outcome(event: StreamEvent) -> EventOutcome {
    match event {
        StreamEvent::MessageStart { message } => match message.usage {
            Some(usage) => EventOutcome::Chunk(StreamChunk {
                usage: Some(Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: 0,
                }),
                ..Default::default()
            }),
            None => EventOutcome::Skip,
        },
        StreamEvent::ContentBlockStart {
            index,
            content_block,
        } => match content_block {
            BlockStart::ToolUse { id, name } => {
                EventOutcome::Chunk(StreamChunk::fragment(ToolCallFragment::start(index, id, name)))
            }
            BlockStart::Text { text } if !text.is_empty() => {
                EventOutcome::Chunk(StreamChunk::text(text))
            }
            _ => EventOutcome::Skip,
        },
        StreamEvent::ContentBlockDelta { index, delta } => match delta {
            BlockDelta::TextDelta { text } => EventOutcome::Chunk(StreamChunk::text(text)),
            BlockDelta::InputJsonDelta { partial_json } => EventOutcome::Chunk(
                StreamChunk::fragment(ToolCallFragment::arguments(index, partial_json)),
            ),
            BlockDelta::Other => EventOutcome::Skip,
        },
        StreamEvent::MessageDelta { delta, usage } => EventOutcome::Chunk(StreamChunk {
            finish_reason: delta.stop_reason.as_deref().map(FinishReason::from_provider),
            usage: usage.map(|usage| Usage {
                input_tokens: 0,
                output_tokens: usage.output_tokens,
            }),
            ..Default::default()
        }),
        StreamEvent::MessageStop => EventOutcome::Stop,
        StreamEvent::Error { error } => {
            EventOutcome::Failed(format!("{}: {}", error.kind, error.message))
        }
        StreamEvent::ContentBlockStop { .. } | StreamEvent::Ping | StreamEvent::Unknown => {
            EventOutcome::Skip
        }
    }
}
