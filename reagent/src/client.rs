//! Thin public façade over a cycle.
//!
//! Wraps an `Arc<Cycle>` with the conveniences an application wants:
//! `run`, history access, emitter and debug wiring, and a one-call
//! [`Client::subscribe`] that installs a channel emitter and hands back the
//! subscriber end.

use std::path::PathBuf;
use std::sync::Arc;

use crate::chain::Cycle;
use crate::error::AgentError;
use crate::events::{self, ChannelSubscriber, Emitter};
use crate::message::Message;
use crate::state::AgentState;

/// Agent handle for application code.
#[derive(Clone)]
pub struct Client {
    cycle: Arc<Cycle>,
}

impl Client {
    pub fn new(cycle: Arc<Cycle>) -> Self {
        Self { cycle }
    }

    pub fn cycle(&self) -> &Arc<Cycle> {
        &self.cycle
    }

    pub fn state(&self) -> Arc<AgentState> {
        self.cycle.state()
    }

    /// One turn against the cycle's bound state. Returns the final answer,
    /// or the canonical user-input marker when the model asked for input.
    /// The first fatal error is returned verbatim with no result.
    pub async fn run(&self, query: &str) -> Result<String, AgentError> {
        self.cycle.run(query).await
    }

    /// Defensive copy of the conversation history.
    pub async fn history(&self) -> Vec<Message> {
        self.cycle.state().history().await
    }

    /// Stage-and-swap restoration of the history.
    pub async fn set_history(&self, history: Vec<Message>) {
        self.cycle.state().set_history(history).await;
    }

    pub async fn clear_history(&self) {
        self.cycle.state().clear_history().await;
    }

    /// Installs a channel emitter as the cycle's default and returns the
    /// subscriber end for the UI.
    pub fn subscribe(&self, capacity: usize) -> ChannelSubscriber {
        let (emitter, subscriber) = events::channel(capacity);
        self.cycle.set_emitter(Some(Arc::new(emitter)));
        subscriber
    }

    pub fn set_emitter(&self, emitter: Option<Arc<dyn Emitter>>) {
        self.cycle.set_emitter(emitter);
    }

    pub fn set_debug_dir(&self, dir: Option<PathBuf>) {
        self.cycle.set_debug_dir(dir);
    }

    pub fn set_streaming(&self, streaming: bool) {
        self.cycle.set_streaming(streaming);
    }
}
