//! Typed step protocol: mechanical flow action × execution signal.
//!
//! The pair disambiguates control flow without string sentinels in normal
//! output: `(Break, FinalAnswer)` ends the turn with an answer,
//! `(Break, NeedUserInput)` ends it asking for input, `(Error, Error)`
//! aborts, `(Continue, None)` proceeds to the next step.

use async_trait::async_trait;

use crate::error::AgentError;

use super::turn::TurnContext;

/// Mechanical flow decision from a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextAction {
    Continue,
    Break,
    Error,
}

/// Semantic control hint to the executor, distinct from the flow action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionSignal {
    #[default]
    None,
    FinalAnswer,
    NeedUserInput,
    Error,
}

/// Result of one step.
#[derive(Debug)]
pub struct StepResult {
    pub action: NextAction,
    pub signal: ExecutionSignal,
    pub error: Option<AgentError>,
}

impl StepResult {
    /// `(Continue, None)` — hand over to the next step.
    pub fn proceed() -> Self {
        Self {
            action: NextAction::Continue,
            signal: ExecutionSignal::None,
            error: None,
        }
    }

    /// `(Break, FinalAnswer)` — the turn ends with a normal answer.
    pub fn finished() -> Self {
        Self {
            action: NextAction::Break,
            signal: ExecutionSignal::FinalAnswer,
            error: None,
        }
    }

    /// `(Break, NeedUserInput)` — the turn ends requesting input.
    pub fn needs_user_input() -> Self {
        Self {
            action: NextAction::Break,
            signal: ExecutionSignal::NeedUserInput,
            error: None,
        }
    }

    /// `(Error, Error, err)` — the turn aborts.
    pub fn failed(error: AgentError) -> Self {
        Self {
            action: NextAction::Error,
            signal: ExecutionSignal::Error,
            error: Some(error),
        }
    }
}

/// One unit of work in a turn.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, turn: &mut TurnContext) -> StepResult;
}
