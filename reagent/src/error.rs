//! Error types for the orchestration core.
//!
//! One public [`AgentError`] covers the turn-fatal kinds (missing dependency,
//! validation, provider failure, tool-step machinery, cancellation). Module
//! errors that are data rather than control flow get their own small enums:
//! [`ToolError`] for tool implementations (surfaced to the model as a tool
//! message, never aborting the turn), [`RegistryError`] and [`TodoError`] for
//! their respective components.

use thiserror::Error;

/// Turn-fatal errors surfaced by steps, the executor and the cycle.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A collaborator the turn cannot run without is absent or unresolved.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// Invalid registration or option decode.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The LLM call failed (auth, network, rate limit, decode).
    #[error("provider error: {0}")]
    Provider(String),

    /// The tool-step machinery itself failed. A tool's own failure is not
    /// this error; it becomes the content of the tool message.
    #[error("tool step failed: {0}")]
    ToolStep(String),

    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    /// The turn's cancellation handle fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The cycle's deadline elapsed before the turn finished.
    #[error("turn deadline exceeded")]
    DeadlineExceeded,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures from tool implementations. These are data: the executor places
/// the message into a `role=tool` message and the loop continues.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Execution(String),
}

/// Registration and lookup failures from the tool and model registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate registration: {0}")]
    Duplicate(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid definition: {0}")]
    InvalidDefinition(String),
}

/// Task lifecycle violations from the todo list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TodoError {
    #[error("task {0} not found")]
    NotFound(u64),

    /// A task transitions only from pending; re-closing is rejected.
    #[error("task {0} is already closed")]
    AlreadyClosed(u64),
}
