//! Event payloads emitted over the turn: thinking, tool activity, final message,
//! error, done. Tool arguments stay raw JSON text; consumers parse if they care.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Payload for one agent event (type + fields).
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Assistant reasoning for the current iteration, delivered whole.
    Thinking {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    /// Incremental reasoning delta while a streaming response is in flight.
    ThinkingChunk { delta: String, reasoning: String },
    /// The model requested a tool invocation.
    ToolCall {
        id: String,
        name: String,
        arguments: String,
    },
    /// One tool finished; `result` is the verbatim tool output.
    ToolResult {
        name: String,
        result: String,
        duration_ms: u64,
    },
    /// Final assistant message content for the turn.
    Message { content: String },
    /// The turn aborted with an error.
    Error { message: String },
    /// The turn completed normally.
    Done { result: String, iterations: u32 },
}

impl EventPayload {
    /// Stable snake_case name of this payload's type tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::ThinkingChunk { .. } => "thinking_chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Message { .. } => "message",
            Self::Error { .. } => "error",
            Self::Done { .. } => "done",
        }
    }
}

/// One agent event: payload plus the moment it was produced.
#[derive(Clone, Debug, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    /// Stamps a payload with the current time.
    pub fn now(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Serializes this event to a JSON object (timestamp + type + payload).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_type_tag() {
        let ev = Event::now(EventPayload::ToolResult {
            name: "echo".into(),
            result: "y".into(),
            duration_ms: 3,
        });
        let value = ev.to_value().unwrap();
        assert_eq!(value["type"], "tool_result");
        assert_eq!(value["name"], "echo");
        assert_eq!(value["duration_ms"], 3);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn kind_matches_serde_tag() {
        let payload = EventPayload::ThinkingChunk {
            delta: "a".into(),
            reasoning: "a".into(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], payload.kind());
    }

    #[test]
    fn thinking_without_reasoning_omits_field() {
        let payload = EventPayload::Thinking {
            content: "hello".into(),
            reasoning: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("reasoning").is_none());
    }
}
