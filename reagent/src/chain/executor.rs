//! ReAct executor: the iteration state machine over one execution.
//!
//! Lifecycle contract: exactly one `on_start`, then interleaved iteration
//! start/end pairs, then exactly one `on_finish` — on success, error and
//! cancellation alike. Within one turn, history appends are totally ordered
//! by this loop.

use std::time::Instant;

use crate::error::AgentError;
use crate::message::{Message, Role};

use super::execution::Execution;
use super::observer::{ExecutionObserver, IterationObserver};
use super::step::{ExecutionSignal, Step, StepResult};
use super::ChainOutput;

/// Runs the step pipeline across iterations and dispatches observers.
#[derive(Default)]
pub struct ReactExecutor;

impl ReactExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, mut execution: Execution) -> Result<ChainOutput, AgentError> {
        let started = Instant::now();
        let query = execution.turn.input().to_string();
        tracing::debug!(max_iterations = execution.max_iterations, "turn started");

        for observer in &execution.observers {
            observer.on_start(&query).await;
        }

        execution.turn.append(Message::user(query)).await;

        let cancel = execution.cancel.clone();
        let mut signal = ExecutionSignal::None;
        let mut iterations = 0u32;

        for i in 1..=execution.max_iterations {
            iterations = i;
            execution.turn.set_iteration(i);
            for observer in &execution.observers {
                observer.on_iteration_start(i).await;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => StepResult::failed(AgentError::Cancelled),
                result = execution.llm_step.execute(&mut execution.turn) => result,
            };
            if let Some(err) = result.error {
                return self.finish_with_error(&execution, err).await;
            }

            let last = execution.turn.last_message().await;
            if let Some(last) = &last {
                // A streamed call already delivered reasoning chunk by
                // chunk; re-emitting the whole thinking would duplicate it.
                if !execution.turn.streamed() {
                    execution
                        .iteration_observer
                        .emit_thinking(&last.content, last.reasoning.as_deref())
                        .await;
                }
                for call in &last.tool_calls {
                    execution.iteration_observer.emit_tool_call(call).await;
                }
            }

            if matches!(
                result.signal,
                ExecutionSignal::FinalAnswer | ExecutionSignal::NeedUserInput
            ) {
                signal = result.signal;
                for observer in &execution.observers {
                    observer.on_iteration_end(i).await;
                }
                break;
            }

            if !last.as_ref().is_some_and(Message::has_tool_calls) {
                signal = ExecutionSignal::FinalAnswer;
                for observer in &execution.observers {
                    observer.on_iteration_end(i).await;
                }
                break;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => StepResult::failed(AgentError::Cancelled),
                result = execution.tool_step.execute(&mut execution.turn) => result,
            };
            if let Some(err) = result.error {
                return self.finish_with_error(&execution, err).await;
            }

            for trace in execution.turn.take_tool_traces() {
                execution
                    .iteration_observer
                    .emit_tool_result(&trace.name, &trace.result, trace.duration)
                    .await;
            }

            for observer in &execution.observers {
                observer.on_iteration_end(i).await;
            }

            // Cap reached right after a tool iteration: the last assistant
            // message stands as the answer.
            if i == execution.max_iterations {
                signal = ExecutionSignal::FinalAnswer;
            }
        }

        let final_messages = execution.turn.history().await;
        let result = final_messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        execution.iteration_observer.emit_message(&result).await;

        let output = ChainOutput {
            result,
            iterations,
            duration: started.elapsed(),
            final_messages,
            debug_log_path: execution.debug_log_path.clone(),
            signal,
            usage: execution.turn.usage(),
        };
        tracing::debug!(
            iterations = output.iterations,
            signal = ?output.signal,
            "turn finished"
        );
        for observer in &execution.observers {
            observer.on_finish(Some(&output), None).await;
        }
        Ok(output)
    }

    async fn finish_with_error(
        &self,
        execution: &Execution,
        error: AgentError,
    ) -> Result<ChainOutput, AgentError> {
        tracing::warn!(iteration = execution.turn.iteration(), "turn aborted: {error}");
        for observer in &execution.observers {
            observer.on_finish(None, Some(&error)).await;
        }
        Err(error)
    }
}
