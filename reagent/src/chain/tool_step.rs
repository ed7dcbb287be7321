//! Tool step: execute every call from the last assistant message, append one
//! `role=tool` message per call, record traces, activate a post-prompt.
//!
//! A tool's own failure is data, not control flow — the failure text becomes
//! the tool message content so the model can react, and the loop continues.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::debug::{DebugRecorder, ToolTrace};
use crate::error::AgentError;
use crate::message::{Message, Role};
use crate::prompts::PromptLoader;
use crate::registry::{Tool, ToolRegistry};

use super::step::{Step, StepResult};
use super::turn::{ToolExecution, TurnContext};

/// The acting half of the turn: runs the model's tool calls in order.
#[derive(Clone)]
pub struct ToolStep {
    tools: Arc<ToolRegistry>,
    prompt_loader: Option<Arc<dyn PromptLoader>>,
    recorder: Option<Arc<DebugRecorder>>,
}

impl ToolStep {
    pub fn new(tools: Arc<ToolRegistry>, prompt_loader: Option<Arc<dyn PromptLoader>>) -> Self {
        Self {
            tools,
            prompt_loader,
            recorder: None,
        }
    }

    /// Execution-scoped clone carrying the turn's recorder.
    pub(crate) fn bind(&self, tools: Arc<ToolRegistry>, recorder: Option<Arc<DebugRecorder>>) -> Self {
        Self {
            tools,
            recorder,
            ..self.clone()
        }
    }

    /// Looks up the post-prompt bound to the first tool's name and installs
    /// it for the next LLM step. With parallel tool calls the first call's
    /// prompt wins; any distinct later candidates are logged and skipped.
    fn activate_post_prompt(&self, turn: &mut TurnContext, message: &Message) {
        let Some(loader) = &self.prompt_loader else {
            return;
        };
        let Some(first) = message.tool_calls.first() else {
            return;
        };
        match loader.load_tool_post_prompt(&first.name) {
            Ok(Some(prompt)) if prompt.config.enabled => {
                for call in message.tool_calls.iter().skip(1) {
                    if call.name == first.name {
                        continue;
                    }
                    if let Ok(Some(other)) = loader.load_tool_post_prompt(&call.name) {
                        if other.config.enabled {
                            tracing::warn!(
                                activated = %first.name,
                                skipped = %call.name,
                                "multiple tool post-prompts in one iteration; first wins"
                            );
                        }
                    }
                }
                turn.set_post_prompt(prompt);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(tool = %first.name, "post-prompt load failed: {err}");
            }
        }
    }
}

#[async_trait]
impl Step for ToolStep {
    fn name(&self) -> &'static str {
        "tools"
    }

    async fn execute(&self, turn: &mut TurnContext) -> StepResult {
        let Some(last) = turn.last_message().await else {
            return StepResult::proceed();
        };
        if last.role != Role::Assistant || last.tool_calls.is_empty() {
            return StepResult::proceed();
        }

        for call in &last.tool_calls {
            if turn.cancel().is_cancelled() {
                return StepResult::failed(AgentError::Cancelled);
            }

            let args = sanitize_tool_args(&call.arguments);
            let started = Instant::now();
            let (result_text, success, error) = match self.tools.get(&call.name) {
                Err(_) => {
                    let reason = format!("tool '{}' not found", call.name);
                    (format!("Error: {reason}"), false, Some(reason))
                }
                Ok(tool) => match tool.execute(turn.cancel(), &args).await {
                    Ok(text) => (text, true, None),
                    Err(err) => (format!("Error: {err}"), false, Some(err.to_string())),
                },
            };
            let duration = started.elapsed();
            tracing::debug!(
                tool = %call.name,
                success,
                duration_ms = duration.as_millis() as u64,
                "tool executed"
            );

            turn.append(Message::tool(call.id.clone(), result_text.clone()))
                .await;

            if let Some(recorder) = &self.recorder {
                recorder.record_tool(ToolTrace {
                    name: call.name.clone(),
                    args: args.clone(),
                    result: result_text.clone(),
                    result_truncated: None,
                    duration_ms: duration.as_millis() as u64,
                    success,
                    error,
                });
            }
            turn.push_tool_trace(ToolExecution {
                name: call.name.clone(),
                args,
                result: result_text,
                duration,
                success,
            });
        }

        self.activate_post_prompt(turn, &last);
        StepResult::proceed()
    }
}

/// Strips common Markdown code-fence artifacts around the argument text.
pub(crate) fn sanitize_tool_args(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop a language tag like `json` up to the first newline.
    let inner = match inner.find('\n') {
        Some(pos) => &inner[pos + 1..],
        None => inner,
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim().to_string()
}
