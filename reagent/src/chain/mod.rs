//! The per-turn pipeline: cycle template, execution container, steps,
//! executor, observers.
//!
//! # Main types
//!
//! - **[`Cycle`]**: immutable template; validates dependencies, snapshots the
//!   three runtime defaults under a short read lock, builds one [`Execution`]
//!   per turn and delegates to the executor.
//! - **[`LlmStep`]** / **[`ToolStep`]**: the two units of work in a turn,
//!   each returning a typed [`StepResult`].
//! - **[`ReactExecutor`]**: drives steps across iterations and dispatches
//!   observer callbacks.
//! - **[`ExecutionObserver`] / [`IterationObserver`]**
//!   (in [`observer`]): the fabric for cross-cutting concerns.
//!
//! Concurrency property: no lock is held across the LLM call or tool
//! execution, so any number of `Cycle::execute` calls run fully in parallel;
//! the only shared mutable object is the
//! [`AgentState`](crate::state::AgentState), which carries its own locking
//! discipline.

pub mod cycle;
pub mod execution;
pub mod executor;
pub mod llm_step;
pub mod observer;
pub mod step;
pub mod tool_step;
pub mod turn;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::message::Message;
use crate::provider::TokenUsage;
use crate::registry::ToolRegistry;
use crate::state::AgentState;

pub use cycle::Cycle;
pub use execution::Execution;
pub use executor::ReactExecutor;
pub use llm_step::LlmStep;
pub use observer::{
    EmitterIterationObserver, EmitterObserver, ExecutionObserver, IterationObserver,
};
pub use step::{ExecutionSignal, NextAction, Step, StepResult};
pub use tool_step::ToolStep;
pub use turn::{ToolExecution, TurnContext};

/// Canonical marker a turn returns instead of an answer when the model
/// requests user input. Isolated at the façade boundary for backward
/// compatibility with callers that match on it.
pub const USER_CHOICE_REQUIRED: &str = "__USER_CHOICE_REQUIRED__";

/// Input to one turn.
pub struct ChainInput {
    pub query: String,
    /// Shared agent state the turn reads from and appends to.
    pub state: Arc<AgentState>,
    /// Per-turn tool registry override; defaults to the cycle's.
    pub tools: Option<Arc<ToolRegistry>>,
    /// Cancellation handle; the cycle derives its deadline token from it.
    pub cancel: Option<CancellationToken>,
}

impl ChainInput {
    pub fn new(query: impl Into<String>, state: Arc<AgentState>) -> Self {
        Self {
            query: query.into(),
            state,
            tools: None,
            cancel: None,
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Output of one turn.
#[derive(Clone, Debug)]
pub struct ChainOutput {
    /// Content of the final assistant message.
    pub result: String,
    pub iterations: u32,
    pub duration: Duration,
    /// Snapshot of the full history at turn end.
    pub final_messages: Vec<Message>,
    /// Where the debug trace was written, when recording was on.
    pub debug_log_path: Option<PathBuf>,
    pub signal: ExecutionSignal,
    /// Aggregate token usage over the turn, when providers report it.
    pub usage: Option<TokenUsage>,
}
