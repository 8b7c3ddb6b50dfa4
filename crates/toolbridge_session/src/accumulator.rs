//! Reassembly of streamed tool-call fragments.

use crate::chunk::ToolCallFragment;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: String,
    buffer: String,
}

/// A tool call whose arguments have been fully received.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledCall {
    /// Call id (generated when the provider omitted one)
    pub id: String,
    /// Tool name as the provider sent it
    pub name: String,
    /// Raw argument text
    pub raw_arguments: String,
    /// Parsed arguments, or the parse error
    pub arguments: Result<Value, String>,
}

impl AssembledCall {
    /// Arguments to record in the transcript.
    ///
    /// Unparseable text is kept verbatim as a JSON string.
    pub fn transcript_arguments(&self) -> Value {
        match &self.arguments {
            Ok(value) => value.clone(),
            Err(_) => Value::String(self.raw_arguments.clone()),
        }
    }
}

/// Collects fragments keyed by call index.
///
/// Argument text is only parsed in [`finish`](Self::finish), once the provider
/// has signalled the response is complete.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, PendingCall>,
}

impl ToolCallAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one fragment into the call at its index.
    pub fn push(&mut self, fragment: ToolCallFragment) {
        let call = self.calls.entry(fragment.index).or_default();
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            call.id = Some(id);
        }
        if let Some(name) = fragment.name.filter(|name| !name.is_empty())
            && call.name.is_empty()
        {
            call.name = name;
        }
        if let Some(arguments) = fragment.arguments {
            call.buffer.push_str(&arguments);
        }
    }

    /// Whether no fragments have been received.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Number of distinct calls seen.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Names of the calls received so far, in index order.
    pub fn pending_names(&self) -> Vec<String> {
        self.calls.values().map(|call| call.name.clone()).collect()
    }

    /// Parses every buffered call, in index order.
    pub fn finish(self) -> Vec<AssembledCall> {
        self.calls
            .into_iter()
            .map(|(index, call)| {
                let id = call
                    .id
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                let arguments = parse_arguments(&call.buffer);
                match &arguments {
                    Ok(_) => debug!(index, tool = %call.name, "Assembled tool call"),
                    Err(e) => warn!(index, tool = %call.name, error = %e, "Tool call arguments are not valid JSON"),
                }
                AssembledCall {
                    id,
                    name: call.name,
                    raw_arguments: call.buffer,
                    arguments,
                }
            })
            .collect()
    }
}

fn parse_arguments(buffer: &str) -> Result<Value, String> {
    if buffer.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(buffer).map_err(|e| e.to_string())
}
