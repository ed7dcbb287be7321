//! # Reagent
//!
//! A library core for building LLM agents around the **ReAct** loop: the
//! model alternates between text / tool-call requests and tool execution,
//! each result feeding the next reasoning step until a final answer or an
//! iteration cap.
//!
//! ## Design principles
//!
//! - **Immutable template, per-turn execution**: a [`Cycle`] validates its
//!   dependencies once and builds a private [`chain::Execution`] per turn;
//!   concurrency comes from data isolation, not locking. The template's only
//!   lock guards three toggleable defaults (emitter, debug directory,
//!   streaming) and is held for a snapshot copy.
//! - **Typed step signals**: steps return a
//!   [`StepResult`](chain::StepResult) pairing a mechanical action with an
//!   [`ExecutionSignal`](chain::ExecutionSignal) — no string sentinels in
//!   normal output. The one remaining sentinel (the user-input marker) is
//!   isolated at the façade boundary.
//! - **Capability seams over inheritance**: tools and providers are consumed
//!   via [`Tool`], [`LlmProvider`] and the optional [`StreamingProvider`]
//!   extension; registries dispatch by name.
//! - **Observer fabric**: debug tracing and event emission hang off
//!   [`chain::ExecutionObserver`] / [`chain::IterationObserver`] rather than
//!   living in the loop; a new cross-cutting concern is a new observer.
//! - **One authoritative state**: the shared [`AgentState`] owns history,
//!   scratchpad files and the plan behind its own lock; turn contexts
//!   delegate instead of copying.
//!
//! ## Main modules
//!
//! - [`chain`]: [`Cycle`], [`ChainInput`]/[`ChainOutput`], the LLM and tool
//!   steps, the executor and the observer fabric.
//! - [`state`]: [`AgentState`], [`FileMeta`], [`TodoManager`].
//! - [`registry`]: [`ToolRegistry`], [`ModelRegistry`] and the [`Tool`]
//!   seam.
//! - [`provider`]: [`LlmProvider`], [`StreamingProvider`],
//!   [`MockProvider`].
//! - [`prompts`]: [`PromptLoader`], [`PostPrompt`], [`StaticPromptLoader`].
//! - [`events`]: [`Emitter`]/[`Subscriber`] ports and the channel adapter;
//!   wire types re-exported from the `agent-event` crate.
//! - [`debug`]: per-run JSON trace recording.
//! - [`client`]: the [`Client`] façade.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reagent::{
//!     Client, Cycle, CycleConfig, MockProvider, ModelDefinition, ModelRegistry, ToolRegistry,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), reagent::AgentError> {
//! let models = Arc::new(ModelRegistry::new());
//! models
//!     .register(
//!         "mock",
//!         ModelDefinition::new("mock"),
//!         Arc::new(MockProvider::with_final("hello")),
//!     )
//!     .expect("fresh registry");
//!
//! let config = CycleConfig {
//!     default_model: "mock".into(),
//!     ..CycleConfig::default()
//! };
//! let client = Client::new(Arc::new(Cycle::new(models, Arc::new(ToolRegistry::new()), config)));
//! let answer = client.run("say hello").await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod client;
pub mod config;
pub mod debug;
pub mod error;
pub mod events;
pub mod message;
pub mod prompts;
pub mod provider;
pub mod registry;
pub mod state;

pub use chain::{
    ChainInput, ChainOutput, Cycle, EmitterIterationObserver, EmitterObserver, Execution,
    ExecutionObserver, ExecutionSignal, IterationObserver, LlmStep, NextAction, ReactExecutor,
    Step, StepResult, ToolExecution, ToolStep, TurnContext, USER_CHOICE_REQUIRED,
};
pub use client::Client;
pub use config::CycleConfig;
pub use debug::{DebugObserver, DebugRecorder, RunTrace, TRUNCATED_SUFFIX};
pub use error::{AgentError, RegistryError, TodoError, ToolError};
pub use events::{
    channel, ChannelEmitter, ChannelSubscriber, Emitter, Event, EventPayload, Subscriber,
};
pub use message::{Message, Role, ToolCall};
pub use prompts::{PostPrompt, PostPromptConfig, PromptLoader, StaticPromptLoader};
pub use provider::mock::MockProvider;
pub use provider::{
    ChunkKind, GenerateOptions, LlmProvider, ProviderResponse, StreamChunk, StreamingProvider,
    TokenUsage,
};
pub use registry::{ModelDefinition, ModelRegistry, Tool, ToolDefinition, ToolRegistry};
pub use state::{AgentState, FileMeta, Task, TaskStatus, TodoManager, TodoStats};
