//! Observer fabric: lifecycle and per-iteration notification seams.
//!
//! Two disjoint interfaces. [`ExecutionObserver`]s (a list) see the turn
//! lifecycle: exactly one `on_start`, interleaved iteration pairs, exactly
//! one `on_finish` — always, including error paths. The single
//! [`IterationObserver`] is called with typed helpers for thinking, tool
//! calls, tool results and the final message. Absent observers are no-ops;
//! implementations must not fail the turn — event delivery errors are
//! swallowed at the emitter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::events::{Emitter, EventPayload};
use crate::message::ToolCall;

use super::ChainOutput;

/// Lifecycle notifications for one turn.
#[async_trait]
pub trait ExecutionObserver: Send + Sync {
    async fn on_start(&self, _query: &str) {}

    async fn on_iteration_start(&self, _iteration: u32) {}

    async fn on_iteration_end(&self, _iteration: u32) {}

    /// Exactly one of `output` / `error` is set.
    async fn on_finish(&self, _output: Option<&ChainOutput>, _error: Option<&AgentError>) {}
}

/// Per-step emissions within an iteration.
#[async_trait]
pub trait IterationObserver: Send + Sync {
    async fn emit_thinking(&self, _content: &str, _reasoning: Option<&str>) {}

    async fn emit_tool_call(&self, _call: &ToolCall) {}

    async fn emit_tool_result(&self, _name: &str, _result: &str, _duration: Duration) {}

    async fn emit_message(&self, _content: &str) {}
}

/// Forwards turn completion onto the emitter as a `Done` or `Error` event.
pub struct EmitterObserver {
    emitter: Arc<dyn Emitter>,
}

impl EmitterObserver {
    pub fn new(emitter: Arc<dyn Emitter>) -> Self {
        Self { emitter }
    }
}

#[async_trait]
impl ExecutionObserver for EmitterObserver {
    async fn on_finish(&self, output: Option<&ChainOutput>, error: Option<&AgentError>) {
        if let Some(err) = error {
            self.emitter
                .emit_payload(EventPayload::Error {
                    message: err.to_string(),
                })
                .await;
        } else if let Some(out) = output {
            self.emitter
                .emit_payload(EventPayload::Done {
                    result: out.result.clone(),
                    iterations: out.iterations,
                })
                .await;
        }
    }
}

/// Default iteration observer: posts typed events onto an emitter, or does
/// nothing when none is configured.
pub struct EmitterIterationObserver {
    emitter: Option<Arc<dyn Emitter>>,
}

impl EmitterIterationObserver {
    pub fn new(emitter: Option<Arc<dyn Emitter>>) -> Self {
        Self { emitter }
    }
}

#[async_trait]
impl IterationObserver for EmitterIterationObserver {
    async fn emit_thinking(&self, content: &str, reasoning: Option<&str>) {
        if let Some(emitter) = &self.emitter {
            emitter
                .emit_payload(EventPayload::Thinking {
                    content: content.to_string(),
                    reasoning: reasoning.map(str::to_string),
                })
                .await;
        }
    }

    async fn emit_tool_call(&self, call: &ToolCall) {
        if let Some(emitter) = &self.emitter {
            emitter
                .emit_payload(EventPayload::ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                })
                .await;
        }
    }

    async fn emit_tool_result(&self, name: &str, result: &str, duration: Duration) {
        if let Some(emitter) = &self.emitter {
            emitter
                .emit_payload(EventPayload::ToolResult {
                    name: name.to_string(),
                    result: result.to_string(),
                    duration_ms: duration.as_millis() as u64,
                })
                .await;
        }
    }

    async fn emit_message(&self, content: &str) {
        if let Some(emitter) = &self.emitter {
            emitter
                .emit_payload(EventPayload::Message {
                    content: content.to_string(),
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{channel, Subscriber};

    #[tokio::test]
    async fn emitter_observer_maps_finish_to_done_or_error() {
        let (emitter, mut subscriber) = channel(4);
        let observer = EmitterObserver::new(Arc::new(emitter));

        let output = ChainOutput {
            result: "answer".into(),
            iterations: 2,
            duration: Duration::from_millis(5),
            final_messages: vec![],
            debug_log_path: None,
            signal: super::super::ExecutionSignal::FinalAnswer,
            usage: None,
        };
        observer.on_finish(Some(&output), None).await;
        observer
            .on_finish(None, Some(&AgentError::Provider("down".into())))
            .await;

        assert_eq!(subscriber.next_event().await.unwrap().payload.kind(), "done");
        assert_eq!(subscriber.next_event().await.unwrap().payload.kind(), "error");
    }

    #[tokio::test]
    async fn iteration_observer_without_emitter_is_noop() {
        let observer = EmitterIterationObserver::new(None);
        // Must simply not panic.
        observer.emit_thinking("t", None).await;
        observer
            .emit_tool_result("echo", "r", Duration::from_millis(1))
            .await;
        observer.emit_message("m").await;
    }
}
