//! Per-turn mutable facade over the shared agent state.
//!
//! The turn context does not own history — it delegates to the
//! [`AgentState`], so there is exactly one authoritative history even when
//! concurrent turns share a state. What it does own is turn-local: the
//! iteration counter, the active post-prompt, the parameters actually used
//! by the last LLM call, the streaming flag, and the tool traces the
//! executor drains for observer emission.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::message::Message;
use crate::prompts::PostPrompt;
use crate::provider::TokenUsage;
use crate::state::AgentState;

/// One executed tool call, kept for observer emission.
#[derive(Clone, Debug)]
pub struct ToolExecution {
    pub name: String,
    pub args: String,
    pub result: String,
    pub duration: Duration,
    pub success: bool,
}

/// Turn-local state threaded through the step pipeline.
pub struct TurnContext {
    input: String,
    state: Arc<AgentState>,
    cancel: CancellationToken,
    iteration: u32,
    post_prompt: Option<PostPrompt>,
    resolved_model: String,
    resolved_temperature: Option<f32>,
    resolved_max_tokens: Option<u32>,
    streamed: bool,
    tool_traces: Vec<ToolExecution>,
    usage: Option<TokenUsage>,
}

impl TurnContext {
    pub fn new(input: impl Into<String>, state: Arc<AgentState>, cancel: CancellationToken) -> Self {
        Self {
            input: input.into(),
            state,
            cancel,
            iteration: 0,
            post_prompt: None,
            resolved_model: String::new(),
            resolved_temperature: None,
            resolved_max_tokens: None,
            streamed: false,
            tool_traces: Vec::new(),
            usage: None,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn state(&self) -> &Arc<AgentState> {
        &self.state
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn set_iteration(&mut self, iteration: u32) {
        self.iteration = iteration;
    }

    // --- history, delegated to the shared state ---

    pub async fn append(&self, message: Message) {
        self.state.append(message).await;
    }

    pub async fn last_message(&self) -> Option<Message> {
        self.state.last_message().await
    }

    pub async fn history(&self) -> Vec<Message> {
        self.state.history().await
    }

    // --- post-prompt ---

    /// Installs a post-prompt for the next LLM step.
    pub fn set_post_prompt(&mut self, prompt: PostPrompt) {
        self.post_prompt = Some(prompt);
    }

    /// Consumes the active post-prompt; it applies to exactly one iteration.
    pub fn take_post_prompt(&mut self) -> Option<PostPrompt> {
        self.post_prompt.take()
    }

    pub fn has_post_prompt(&self) -> bool {
        self.post_prompt.is_some()
    }

    // --- parameters actually used, for debug recording ---

    pub fn set_resolved(
        &mut self,
        model: String,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) {
        self.resolved_model = model;
        self.resolved_temperature = temperature;
        self.resolved_max_tokens = max_tokens;
    }

    pub fn resolved_model(&self) -> &str {
        &self.resolved_model
    }

    pub fn resolved_temperature(&self) -> Option<f32> {
        self.resolved_temperature
    }

    pub fn resolved_max_tokens(&self) -> Option<u32> {
        self.resolved_max_tokens
    }

    // --- streaming coordination ---

    /// Whether the last LLM invocation streamed. The executor suppresses the
    /// duplicate whole-thinking event when it did.
    pub fn streamed(&self) -> bool {
        self.streamed
    }

    pub fn set_streamed(&mut self, streamed: bool) {
        self.streamed = streamed;
    }

    // --- tool traces ---

    pub fn push_tool_trace(&mut self, trace: ToolExecution) {
        self.tool_traces.push(trace);
    }

    /// Drains the traces of the iteration's tool executions.
    pub fn take_tool_traces(&mut self) -> Vec<ToolExecution> {
        std::mem::take(&mut self.tool_traces)
    }

    // --- usage aggregation ---

    pub fn add_usage(&mut self, usage: TokenUsage) {
        self.usage.get_or_insert_with(TokenUsage::default).add(&usage);
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_goes_to_the_shared_state() {
        let state = Arc::new(AgentState::new());
        let turn = TurnContext::new("hi", Arc::clone(&state), CancellationToken::new());
        turn.append(Message::user("hi")).await;

        assert_eq!(state.history().await.len(), 1);
        assert_eq!(turn.last_message().await.unwrap().content, "hi");
    }

    #[test]
    fn post_prompt_is_consumed_once() {
        let mut turn = TurnContext::new(
            "q",
            Arc::new(AgentState::new()),
            CancellationToken::new(),
        );
        turn.set_post_prompt(PostPrompt::new("alt"));
        assert!(turn.has_post_prompt());
        assert!(turn.take_post_prompt().is_some());
        assert!(turn.take_post_prompt().is_none());
    }

    #[test]
    fn usage_aggregates_across_iterations() {
        let mut turn = TurnContext::new(
            "q",
            Arc::new(AgentState::new()),
            CancellationToken::new(),
        );
        turn.add_usage(TokenUsage {
            prompt_tokens: 5,
            completion_tokens: 5,
            total_tokens: 10,
        });
        turn.add_usage(TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 1,
            total_tokens: 2,
        });
        assert_eq!(turn.usage().unwrap().total_tokens, 12);
    }
}
