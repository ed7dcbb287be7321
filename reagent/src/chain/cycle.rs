//! Cycle template: immutable over its dependencies, one execution per turn.
//!
//! The template owns the step templates, the registries and the config. The
//! only mutability is a small lock around three runtime defaults that can be
//! toggled at any time (emitter, debug directory, streaming flag); it is
//! held just long enough to snapshot them at the start of a turn. Because no
//! lock spans the LLM call or tool execution, concurrent `execute` calls on
//! one template run fully in parallel.

use std::sync::{Arc, RwLock};

use crate::config::CycleConfig;
use crate::debug::{DebugObserver, DebugRecorder};
use crate::error::AgentError;
use crate::events::Emitter;
use crate::prompts::PromptLoader;
use crate::registry::{ModelRegistry, ToolRegistry};
use crate::state::AgentState;

use super::execution::Execution;
use super::executor::ReactExecutor;
use super::llm_step::LlmStep;
use super::observer::{EmitterIterationObserver, EmitterObserver, ExecutionObserver};
use super::step::ExecutionSignal;
use super::tool_step::ToolStep;
use super::turn::TurnContext;
use super::{ChainInput, ChainOutput, USER_CHOICE_REQUIRED};

/// The three defaults that may be toggled while turns are running.
#[derive(Clone, Default)]
struct RuntimeDefaults {
    emitter: Option<Arc<dyn Emitter>>,
    debug_dir: Option<std::path::PathBuf>,
    streaming: bool,
}

/// Immutable factory for turns.
pub struct Cycle {
    models: Arc<ModelRegistry>,
    tools: Arc<ToolRegistry>,
    state: Arc<AgentState>,
    config: CycleConfig,
    llm_template: LlmStep,
    tool_template: ToolStep,
    runtime: RwLock<RuntimeDefaults>,
}

impl Cycle {
    pub fn new(models: Arc<ModelRegistry>, tools: Arc<ToolRegistry>, config: CycleConfig) -> Self {
        let llm_template = LlmStep::new(
            Arc::clone(&models),
            Arc::clone(&tools),
            config.system_prompt.clone(),
            config.default_model.clone(),
            config.default_vision_model.clone(),
        );
        let tool_template = ToolStep::new(Arc::clone(&tools), None);
        let runtime = RuntimeDefaults {
            emitter: None,
            debug_dir: config.debug_dir.clone(),
            streaming: config.streaming,
        };
        Self {
            models,
            tools,
            state: Arc::new(AgentState::new()),
            config,
            llm_template,
            tool_template,
            runtime: RwLock::new(runtime),
        }
    }

    /// Binds a post-prompt loader; the tool step consults it after each
    /// iteration's calls.
    pub fn with_prompt_loader(mut self, loader: Arc<dyn PromptLoader>) -> Self {
        self.tool_template = ToolStep::new(Arc::clone(&self.tools), Some(loader));
        self
    }

    /// Replaces the cycle's bound state (the one `run` uses).
    pub fn with_state(mut self, state: Arc<AgentState>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> Arc<AgentState> {
        Arc::clone(&self.state)
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    // --- runtime defaults, toggleable at any time ---

    pub fn set_emitter(&self, emitter: Option<Arc<dyn Emitter>>) {
        self.runtime.write().expect("runtime lock").emitter = emitter;
    }

    pub fn set_debug_dir(&self, dir: Option<std::path::PathBuf>) {
        self.runtime.write().expect("runtime lock").debug_dir = dir;
    }

    pub fn set_streaming(&self, streaming: bool) {
        self.runtime.write().expect("runtime lock").streaming = streaming;
    }

    fn validate(&self) -> Result<(), AgentError> {
        if self.models.is_empty() {
            return Err(AgentError::MissingDependency(
                "model registry has no models".into(),
            ));
        }
        if self.config.default_model.is_empty() {
            return Err(AgentError::MissingDependency(
                "default model not configured".into(),
            ));
        }
        if self.models.get(&self.config.default_model).is_err() {
            return Err(AgentError::MissingDependency(format!(
                "default model '{}' not registered",
                self.config.default_model
            )));
        }
        Ok(())
    }

    /// Runs one turn: validate, snapshot runtime defaults, build a fresh
    /// execution, delegate to the executor.
    pub async fn execute(&self, input: ChainInput) -> Result<ChainOutput, AgentError> {
        self.validate()?;
        let snapshot = self.runtime.read().expect("runtime lock").clone();

        let parent_cancel = input.cancel.unwrap_or_default();
        let turn_cancel = parent_cancel.child_token();
        let watchdog = self.config.timeout().map(|timeout| {
            let deadline_cancel = turn_cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = deadline_cancel.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => deadline_cancel.cancel(),
                }
            })
        });

        let recorder = snapshot.debug_dir.as_ref().map(|dir| {
            let mut recorder = DebugRecorder::new(dir);
            if let Some(cap) = self.config.trace_truncate_at {
                recorder = recorder.with_truncate_at(cap);
            }
            Arc::new(recorder)
        });
        let debug_log_path = recorder.as_ref().map(|r| r.path().to_path_buf());

        let tools = input.tools.unwrap_or_else(|| Arc::clone(&self.tools));
        let llm_step = self.llm_template.bind(
            Arc::clone(&tools),
            snapshot.emitter.clone(),
            recorder.clone(),
            snapshot.streaming,
        );
        let tool_step = self.tool_template.bind(tools, recorder.clone());

        let mut observers: Vec<Arc<dyn ExecutionObserver>> = Vec::new();
        if let Some(recorder) = &recorder {
            observers.push(Arc::new(DebugObserver::new(Arc::clone(recorder))));
        }
        if let Some(emitter) = &snapshot.emitter {
            observers.push(Arc::new(EmitterObserver::new(Arc::clone(emitter))));
        }

        let execution = Execution::new(
            TurnContext::new(input.query, input.state, turn_cancel.clone()),
            llm_step,
            tool_step,
            observers,
            Arc::new(EmitterIterationObserver::new(snapshot.emitter.clone())),
            self.config.max_iterations,
            turn_cancel.clone(),
            debug_log_path,
        );

        let result = ReactExecutor::new().execute(execution).await;
        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }

        // A cancellation that arrived through the deadline, not the caller's
        // token, reports as the deadline kind.
        match result {
            Err(AgentError::Cancelled)
                if turn_cancel.is_cancelled() && !parent_cancel.is_cancelled() =>
            {
                Err(AgentError::DeadlineExceeded)
            }
            other => other,
        }
    }

    /// Convenience façade over [`execute`](Self::execute) against the
    /// cycle's bound state. On `NeedUserInput` it returns the canonical
    /// marker string instead of an error.
    pub async fn run(&self, query: &str) -> Result<String, AgentError> {
        let input = ChainInput::new(query, self.state());
        let output = self.execute(input).await?;
        if output.signal == ExecutionSignal::NeedUserInput {
            Ok(USER_CHOICE_REQUIRED.to_string())
        } else {
            Ok(output.result)
        }
    }
}
