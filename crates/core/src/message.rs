// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire messages: one JSON array per line.
//!
//! Element 0 is the command/event name, the remaining elements are
//! positional arguments (possibly nested structures). The same shape
//! is used for inbound client commands, outbound broadcast events,
//! and messages to/from supervised subprocesses. Watcher batches are
//! bare arrays of paths, so every element is reachable via [`parts`].
//!
//! [`parts`]: Message::parts

use serde_json::Value;
use thiserror::Error;

/// A single line-framed protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message(Vec<Value>);

/// Errors decoding a protocol line.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("message is not an array")]
    NotArray,

    #[error("message is empty")]
    Empty,
}

impl Message {
    pub fn new(parts: Vec<Value>) -> Self {
        Self(parts)
    }

    /// Build a named command/event message.
    pub fn command(name: &str, args: impl IntoIterator<Item = Value>) -> Self {
        let mut parts = vec![Value::String(name.to_string())];
        parts.extend(args);
        Self(parts)
    }

    /// Decode one protocol line.
    pub fn decode(line: &str) -> Result<Self, MessageError> {
        let value: Value = serde_json::from_str(line)?;
        let Value::Array(parts) = value else {
            return Err(MessageError::NotArray);
        };
        if parts.is_empty() {
            return Err(MessageError::Empty);
        }
        Ok(Self(parts))
    }

    /// Serialize to a single line. serde_json never emits newlines, so
    /// the line-framing invariant holds for nested arguments too.
    pub fn encode(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// The whole message as a JSON value, for embedding in synthesized
    /// events that carry the original event.
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.clone())
    }

    /// The command/event name, when element 0 is a string.
    pub fn name(&self) -> Option<&str> {
        self.0.first().and_then(Value::as_str)
    }

    /// All elements, including the name position.
    pub fn parts(&self) -> &[Value] {
        &self.0
    }

    /// The arguments after the name position.
    pub fn args(&self) -> &[Value] {
        self.0.get(1..).unwrap_or_default()
    }

    /// Argument `index` as a string.
    pub fn str_arg(&self, index: usize) -> Option<&str> {
        self.args().get(index).and_then(Value::as_str)
    }

    /// Argument `index` as an array.
    pub fn array_arg(&self, index: usize) -> Option<&Vec<Value>> {
        self.args().get(index).and_then(Value::as_array)
    }

    /// Arguments from `from` onward coerced to integers. Coercion is
    /// deliberately lenient: numeric strings parse, anything else
    /// coerces to zero — and zero is the whole-file sentinel
    /// downstream, so junk input degrades to a whole-file run.
    pub fn int_args(&self, from: usize) -> Vec<i64> {
        self.args()
            .get(from..)
            .unwrap_or_default()
            .iter()
            .map(|value| match value {
                Value::Number(number) => number.as_i64().unwrap_or(0),
                Value::String(text) => text.trim().parse().unwrap_or(0),
                _ => 0,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
