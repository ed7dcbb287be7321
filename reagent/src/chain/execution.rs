//! Runtime container for one turn.
//!
//! Built fresh by the cycle for every `execute` call: the turn context bound
//! to the input state, execution-scoped step clones, the observer set built
//! from the snapshotted runtime defaults, and the iteration cap. Each
//! execution is private to one task; executions never share mutable data
//! with each other.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::llm_step::LlmStep;
use super::observer::{ExecutionObserver, IterationObserver};
use super::tool_step::ToolStep;
use super::turn::TurnContext;

pub struct Execution {
    pub(crate) turn: TurnContext,
    pub(crate) llm_step: LlmStep,
    pub(crate) tool_step: ToolStep,
    pub(crate) observers: Vec<Arc<dyn ExecutionObserver>>,
    pub(crate) iteration_observer: Arc<dyn IterationObserver>,
    pub(crate) max_iterations: u32,
    pub(crate) cancel: CancellationToken,
    pub(crate) debug_log_path: Option<PathBuf>,
}

impl Execution {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        turn: TurnContext,
        llm_step: LlmStep,
        tool_step: ToolStep,
        observers: Vec<Arc<dyn ExecutionObserver>>,
        iteration_observer: Arc<dyn IterationObserver>,
        max_iterations: u32,
        cancel: CancellationToken,
        debug_log_path: Option<PathBuf>,
    ) -> Self {
        Self {
            turn,
            llm_step,
            tool_step,
            observers,
            iteration_observer,
            max_iterations,
            cancel,
            debug_log_path,
        }
    }
}
