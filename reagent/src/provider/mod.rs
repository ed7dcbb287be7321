//! LLM provider seam: synchronous generate plus an optional streaming
//! capability.
//!
//! The orchestration step depends on a callable that turns a message sequence
//! into one assistant message (content + tool calls). Implementations wrap
//! concrete HTTP clients; this crate ships [`mock::MockProvider`] for tests
//! and demos. Streaming is a capability extension: a provider that implements
//! [`StreamingProvider`] advertises it through
//! [`LlmProvider::as_streaming`], and the step drains chunk events
//! concurrently with the provider future.

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::message::Message;
use crate::registry::{ModelDefinition, ToolDefinition};

/// Resolved generation options for one LLM call. Starts from the model
/// definition's defaults; the step overlays post-prompt overrides.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerateOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Response format hint (e.g. `"json"`); provider-interpreted.
    pub response_format: Option<String>,
    pub parallel_tool_calls: Option<bool>,
}

impl GenerateOptions {
    /// Options seeded from a model definition's defaults.
    pub fn for_model(definition: &ModelDefinition) -> Self {
        Self {
            model: definition.name.clone(),
            temperature: definition.temperature,
            max_tokens: definition.max_tokens,
            response_format: None,
            parallel_tool_calls: definition.parallel_tool_calls,
        }
    }
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One LLM call's result: the assembled assistant message plus usage when
/// the provider reports it.
#[derive(Clone, Debug)]
pub struct ProviderResponse {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

impl ProviderResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Kind of one streamed chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKind {
    /// Reasoning delta; `reasoning` carries the accumulated stream.
    Thinking,
    /// Content delta.
    Content,
    /// The stream failed; `error` is set.
    Error,
    /// Terminal marker; accumulated fields are final.
    Done,
}

/// One chunk from a streaming generation.
#[derive(Clone, Debug)]
pub struct StreamChunk {
    pub kind: ChunkKind,
    /// Content accumulated so far.
    pub content: String,
    /// Reasoning accumulated so far.
    pub reasoning: String,
    /// The text added by this chunk.
    pub delta: String,
    pub error: Option<String>,
}

/// Synchronous generation seam.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One round trip: messages in, assembled assistant message out.
    async fn generate(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        options: &GenerateOptions,
        tools: &[ToolDefinition],
    ) -> Result<ProviderResponse, AgentError>;

    /// Streaming capability discovery; `None` for providers that only
    /// support the synchronous path.
    fn as_streaming(&self) -> Option<&dyn StreamingProvider> {
        None
    }
}

/// Capability extension: chunked generation. The final returned response is
/// the same assembled message the synchronous path would produce.
#[async_trait]
pub trait StreamingProvider: LlmProvider {
    async fn generate_stream(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        chunks: mpsc::Sender<StreamChunk>,
        options: &GenerateOptions,
        tools: &[ToolDefinition],
    ) -> Result<ProviderResponse, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_seed_from_model_definition() {
        let def = ModelDefinition::new("m")
            .with_temperature(0.3)
            .with_max_tokens(512);
        let opts = GenerateOptions::for_model(&def);
        assert_eq!(opts.model, "m");
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(512));
        assert!(opts.response_format.is_none());
    }

    #[test]
    fn usage_accumulates() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        });
        total.add(&TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 3,
        });
        assert_eq!(total.total_tokens, 18);
        assert_eq!(total.prompt_tokens, 11);
    }
}
