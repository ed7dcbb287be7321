//! LLM step: resolve model and options, build context, invoke the provider
//! (streaming when available), append the assistant message, signal.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::debug::{DebugRecorder, LlmRequestTrace, LlmResponseTrace, ToolCallTrace};
use crate::error::AgentError;
use crate::events::{Emitter, EventPayload};
use crate::message::Message;
use crate::provider::{
    ChunkKind, GenerateOptions, LlmProvider, ProviderResponse, StreamChunk, StreamingProvider,
};
use crate::registry::{ModelRegistry, ToolRegistry};

use super::step::{Step, StepResult};
use super::turn::TurnContext;
use super::USER_CHOICE_REQUIRED;

/// Capacity of the per-call chunk channel between provider and forwarder.
const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// The reasoning half of the turn: one LLM round trip.
///
/// Templates carry only the immutable dependencies; the cycle binds an
/// execution-scoped copy with the snapshotted emitter, recorder and
/// streaming flag before each turn.
#[derive(Clone)]
pub struct LlmStep {
    models: Arc<ModelRegistry>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    default_model: String,
    default_vision_model: String,
    emitter: Option<Arc<dyn Emitter>>,
    recorder: Option<Arc<DebugRecorder>>,
    streaming: bool,
}

impl LlmStep {
    pub fn new(
        models: Arc<ModelRegistry>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
        default_model: impl Into<String>,
        default_vision_model: impl Into<String>,
    ) -> Self {
        Self {
            models,
            tools,
            system_prompt: system_prompt.into(),
            default_model: default_model.into(),
            default_vision_model: default_vision_model.into(),
            emitter: None,
            recorder: None,
            streaming: false,
        }
    }

    /// Execution-scoped clone carrying the turn's runtime references.
    pub(crate) fn bind(
        &self,
        tools: Arc<ToolRegistry>,
        emitter: Option<Arc<dyn Emitter>>,
        recorder: Option<Arc<DebugRecorder>>,
        streaming: bool,
    ) -> Self {
        Self {
            tools,
            emitter,
            recorder,
            streaming,
            ..self.clone()
        }
    }

    async fn invoke(
        &self,
        turn: &TurnContext,
        messages: &[Message],
        options: &GenerateOptions,
        provider: &Arc<dyn LlmProvider>,
    ) -> (Result<ProviderResponse, AgentError>, bool) {
        let tool_defs = self.tools.definitions();

        let streaming_provider = if self.streaming && self.emitter.is_some() {
            provider.as_streaming()
        } else {
            None
        };

        let Some(streaming_provider) = streaming_provider else {
            let result = provider
                .generate(turn.cancel(), messages, options, &tool_defs)
                .await;
            return (result, false);
        };

        let emitter = Arc::clone(self.emitter.as_ref().expect("emitter checked above"));
        let (chunk_tx, mut chunk_rx) = mpsc::channel::<StreamChunk>(CHUNK_CHANNEL_CAPACITY);

        let forward = async move {
            while let Some(chunk) = chunk_rx.recv().await {
                match chunk.kind {
                    ChunkKind::Thinking => {
                        emitter
                            .emit_payload(EventPayload::ThinkingChunk {
                                delta: chunk.delta,
                                reasoning: chunk.reasoning,
                            })
                            .await;
                    }
                    // Content deltas ride the same chunk event; thinking-only
                    // chunks (no content delta) are not re-emitted.
                    ChunkKind::Content => {
                        if !chunk.delta.is_empty() {
                            emitter
                                .emit_payload(EventPayload::ThinkingChunk {
                                    delta: chunk.delta,
                                    reasoning: chunk.reasoning,
                                })
                                .await;
                        }
                    }
                    ChunkKind::Error => {
                        if let Some(message) = chunk.error {
                            emitter.emit_payload(EventPayload::Error { message }).await;
                        }
                    }
                    ChunkKind::Done => {}
                }
            }
        };

        let (result, ()) = tokio::join!(
            streaming_provider.generate_stream(
                turn.cancel(),
                messages,
                chunk_tx,
                options,
                &tool_defs
            ),
            forward,
        );
        (result, true)
    }
}

#[async_trait]
impl Step for LlmStep {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn execute(&self, turn: &mut TurnContext) -> StepResult {
        let post = turn.take_post_prompt();

        let requested = post
            .as_ref()
            .and_then(|p| p.config.model.clone())
            .unwrap_or_else(|| self.default_model.clone());
        let (provider, definition) =
            match self.models.get_with_fallback(&requested, &self.default_model) {
                Ok(found) => found,
                Err(err) => return StepResult::failed(err.into()),
            };

        let mut options = GenerateOptions::for_model(&definition);
        if let Some(post) = &post {
            if let Some(temperature) = post.config.temperature {
                options.temperature = Some(temperature);
            }
            if let Some(max_tokens) = post.config.max_tokens {
                options.max_tokens = Some(max_tokens);
            }
            if let Some(format) = &post.config.response_format {
                options.response_format = Some(format.clone());
            }
        }

        let system_prompt = post
            .as_ref()
            .map(|p| p.system_prompt.as_str())
            .unwrap_or(&self.system_prompt);
        let vision = self
            .models
            .is_vision_model(&definition.name, &self.default_vision_model);
        let messages = turn
            .state()
            .build_context_for_model(system_prompt, vision)
            .await;

        if let Some(recorder) = &self.recorder {
            recorder.record_llm_request(LlmRequestTrace {
                model: options.model.clone(),
                temperature: options.temperature,
                max_tokens: options.max_tokens,
                format: options.response_format.clone(),
                system_prompt_used: if post.is_some() { "post_prompt" } else { "base" }.into(),
                messages_count: messages.len(),
            });
        }

        let started = Instant::now();
        let (result, streamed) = self.invoke(turn, &messages, &options, &provider).await;
        turn.set_streamed(streamed);
        let duration_ms = started.elapsed().as_millis() as u64;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(model = %options.model, "llm call failed: {err}");
                if let Some(recorder) = &self.recorder {
                    recorder.record_llm_response(LlmResponseTrace {
                        duration_ms,
                        error: Some(err.to_string()),
                        ..Default::default()
                    });
                }
                return StepResult::failed(err);
            }
        };

        let mut message = response.message;
        if let Some(reasoning) = message.reasoning.clone() {
            message.content = merge_reasoning(&message.content, &reasoning);
        }
        if let Some(usage) = response.usage {
            turn.add_usage(usage);
        }

        if let Some(recorder) = &self.recorder {
            recorder.record_llm_response(LlmResponseTrace {
                content: message.content.clone(),
                tool_calls: message.tool_calls.iter().map(ToolCallTrace::from).collect(),
                duration_ms,
                error: None,
            });
        }

        turn.append(message.clone()).await;
        turn.set_resolved(options.model, options.temperature, options.max_tokens);

        if message.has_tool_calls() {
            StepResult::proceed()
        } else if is_user_input_request(&message.content) {
            StepResult::needs_user_input()
        } else {
            StepResult::finished()
        }
    }
}

/// The marker ends a turn only at the start of the content; quoting it in
/// prose does not.
fn is_user_input_request(content: &str) -> bool {
    content.trim_start().starts_with(USER_CHOICE_REQUIRED)
}

/// Folds a separate reasoning stream into content without duplication:
/// equal or contained strings collapse, distinct ones join with a blank line.
pub(crate) fn merge_reasoning(content: &str, reasoning: &str) -> String {
    if reasoning.is_empty() || content.contains(reasoning) {
        content.to_string()
    } else if reasoning.contains(content) {
        reasoning.to_string()
    } else {
        format!("{reasoning}\n\n{content}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_content_when_reasoning_is_contained() {
        assert_eq!(merge_reasoning("same", "same"), "same");
        assert_eq!(merge_reasoning("the full same answer", "same"), "the full same answer");
        assert_eq!(merge_reasoning("", ""), "");
    }

    #[test]
    fn merge_prefers_longer_side_on_containment() {
        assert_eq!(merge_reasoning("short", "short but longer"), "short but longer");
    }

    #[test]
    fn merge_joins_distinct_with_blank_line() {
        assert_eq!(
            merge_reasoning("answer", "thinking about it"),
            "thinking about it\n\nanswer"
        );
    }

    #[test]
    fn user_input_marker_matches_at_start_only() {
        assert!(is_user_input_request(USER_CHOICE_REQUIRED));
        assert!(is_user_input_request(&format!(
            "  {USER_CHOICE_REQUIRED} which size?"
        )));
        assert!(!is_user_input_request(&format!(
            "the marker is {USER_CHOICE_REQUIRED}"
        )));
    }
}
