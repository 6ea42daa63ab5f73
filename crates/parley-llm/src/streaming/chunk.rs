use serde::Deserialize;
use serde_json::Value;

/// End-of-stream sentinel
pub const DONE_MARKER: &str = "[DONE]";

/// SSE field prefix some backends leave inside the payload
pub const DATA_PREFIX: &str = "data: ";

/// Known shapes of a single stream payload
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    /// The `[DONE]` sentinel
    Done,

    /// Explicit failure object without any choices
    Error(Value),

    /// Trailing accounting record (`usage` with no choices)
    UsageOnly,

    /// Content and/or finish reason from `choices[0]`
    Delta {
        content: String,
        finish_reason: Option<String>,
    },

    /// Valid JSON that carries nothing (heartbeats, empty deltas, scalars)
    Empty,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkEnvelope {
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    choices: Option<Value>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    reasoning_content: Option<Value>,
}

impl Chunk {
    /// Classify one normalized payload (already trimmed, `data: ` stripped).
    ///
    /// Returns `None` when the payload is neither the sentinel nor valid JSON,
    /// leaving the caller to run its fallback classification.
    pub fn from_payload(payload: &str) -> Option<Self> {
        if payload == DONE_MARKER {
            return Some(Self::Done);
        }

        let value: Value = serde_json::from_str(payload).ok()?;
        Some(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            return Self::Empty;
        }

        let envelope: ChunkEnvelope = match serde_json::from_value(value.clone()) {
            Ok(envelope) => envelope,
            Err(_) => return Self::Empty,
        };

        let first_choice = envelope
            .choices
            .as_ref()
            .and_then(Value::as_array)
            .and_then(|choices| choices.first());

        if first_choice.is_none() {
            if envelope.signals_error() {
                return Self::Error(value);
            }
            if envelope.usage.as_ref().is_some_and(is_truthy) {
                return Self::UsageOnly;
            }
            return Self::Empty;
        }

        let choice: StreamChoice = first_choice
            .cloned()
            .and_then(|c| serde_json::from_value(c).ok())
            .unwrap_or_default();

        let content = choice
            .delta
            .as_ref()
            .and_then(|d| {
                non_null_str(d.content.as_ref()).or_else(|| non_null_str(d.reasoning_content.as_ref()))
            })
            .unwrap_or_default();

        let finish_reason = match choice.finish_reason {
            None | Some(Value::Null) => None,
            Some(Value::String(reason)) => Some(reason),
            Some(other) => Some(other.to_string()),
        };

        if content.is_empty() && finish_reason.is_none() {
            return Self::Empty;
        }

        Self::Delta {
            content,
            finish_reason,
        }
    }
}

impl ChunkEnvelope {
    fn signals_error(&self) -> bool {
        if self.error.as_ref().is_some_and(is_truthy) {
            return true;
        }
        match &self.code {
            Some(code) if is_truthy(code) => code.as_f64() != Some(200.0),
            _ => false,
        }
    }
}

/// Strip one leading SSE `data:` field prefix and surrounding whitespace.
///
/// The space after the colon is optional, so a bare `data:` leaves nothing.
pub fn strip_data_prefix(payload: &str) -> &str {
    match payload.strip_prefix("data:") {
        Some(rest) => rest.trim(),
        None => payload,
    }
}

fn non_null_str(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
