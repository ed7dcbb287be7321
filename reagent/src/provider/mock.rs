//! Scripted provider for tests and demos.
//!
//! Plays back a fixed queue of responses ([`MockProvider::scripted`]) or one
//! response forever ([`MockProvider::repeating`]). With
//! [`MockProvider::with_streaming`] it also implements the streaming
//! capability, re-playing reasoning and content in fixed-size chunks so both
//! invocation paths produce byte-for-byte the same final message.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::message::{Message, ToolCall};
use crate::registry::ToolDefinition;

use super::{
    ChunkKind, GenerateOptions, LlmProvider, ProviderResponse, StreamChunk, StreamingProvider,
    TokenUsage,
};

/// Number of characters per replayed chunk.
const CHUNK_CHARS: usize = 8;

enum Script {
    Queue(Mutex<VecDeque<ProviderResponse>>),
    Repeat(ProviderResponse),
}

pub struct MockProvider {
    script: Script,
    streaming: bool,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Plays the given responses in order; erring when the script runs dry.
    pub fn scripted(responses: Vec<ProviderResponse>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(responses.into())),
            streaming: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the same response on every call.
    pub fn repeating(response: ProviderResponse) -> Self {
        Self {
            script: Script::Repeat(response),
            streaming: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// One final answer, no tool calls.
    pub fn with_final(content: impl Into<String>) -> Self {
        Self::scripted(vec![ProviderResponse::new(Message::assistant(content))])
    }

    /// First a single tool call, then a final answer — the minimal two-
    /// iteration script.
    pub fn first_tool_then_final(
        tool: impl Into<String>,
        arguments: impl Into<String>,
        final_content: impl Into<String>,
    ) -> Self {
        Self::scripted(vec![
            ProviderResponse::new(Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call-1", tool, arguments)],
            )),
            ProviderResponse::new(Message::assistant(final_content)),
        ])
    }

    /// A tool call on every iteration; pairs with an iteration cap.
    pub fn always_tool_call(tool: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::repeating(ProviderResponse::new(Message::assistant_with_tool_calls(
            "still working",
            vec![ToolCall::new("call-loop", tool, arguments)],
        )))
    }

    /// Advertise the streaming capability.
    pub fn with_streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Number of generate calls served so far (either path).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<ProviderResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .expect("mock script lock")
                .pop_front()
                .ok_or_else(|| AgentError::Provider("mock provider script exhausted".into())),
            Script::Repeat(response) => Ok(response.clone()),
        }
    }
}

/// Splits on char boundaries into pieces of at most `size` chars.
fn char_chunks(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if current.chars().count() >= size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn generate(
        &self,
        _cancel: &CancellationToken,
        _messages: &[Message],
        _options: &GenerateOptions,
        _tools: &[ToolDefinition],
    ) -> Result<ProviderResponse, AgentError> {
        self.next_response()
    }

    fn as_streaming(&self) -> Option<&dyn StreamingProvider> {
        self.streaming.then_some(self as &dyn StreamingProvider)
    }
}

#[async_trait]
impl StreamingProvider for MockProvider {
    async fn generate_stream(
        &self,
        _cancel: &CancellationToken,
        _messages: &[Message],
        chunks: mpsc::Sender<StreamChunk>,
        _options: &GenerateOptions,
        _tools: &[ToolDefinition],
    ) -> Result<ProviderResponse, AgentError> {
        let response = self.next_response()?;

        let reasoning_full = response.message.reasoning.clone().unwrap_or_default();
        let mut reasoning = String::new();
        for delta in char_chunks(&reasoning_full, CHUNK_CHARS) {
            reasoning.push_str(&delta);
            let _ = chunks
                .send(StreamChunk {
                    kind: ChunkKind::Thinking,
                    content: String::new(),
                    reasoning: reasoning.clone(),
                    delta,
                    error: None,
                })
                .await;
        }

        let mut content = String::new();
        for delta in char_chunks(&response.message.content, CHUNK_CHARS) {
            content.push_str(&delta);
            let _ = chunks
                .send(StreamChunk {
                    kind: ChunkKind::Content,
                    content: content.clone(),
                    reasoning: reasoning.clone(),
                    delta,
                    error: None,
                })
                .await;
        }

        let _ = chunks
            .send(StreamChunk {
                kind: ChunkKind::Done,
                content,
                reasoning,
                delta: String::new(),
                error: None,
            })
            .await;

        Ok(response)
    }
}

/// Response helpers shared by tests.
impl MockProvider {
    /// A response with reasoning attached, for streaming scripts.
    pub fn response_with_reasoning(
        content: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> ProviderResponse {
        let mut message = Message::assistant(content);
        message.reasoning = Some(reasoning.into());
        ProviderResponse::new(message).with_usage(TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_play_in_order_then_err() {
        let provider = MockProvider::scripted(vec![
            ProviderResponse::new(Message::assistant("one")),
            ProviderResponse::new(Message::assistant("two")),
        ]);
        let cancel = CancellationToken::new();

        let first = provider
            .generate(&cancel, &[], &GenerateOptions::default(), &[])
            .await
            .unwrap();
        assert_eq!(first.message.content, "one");

        provider
            .generate(&cancel, &[], &GenerateOptions::default(), &[])
            .await
            .unwrap();
        let exhausted = provider
            .generate(&cancel, &[], &GenerateOptions::default(), &[])
            .await;
        assert!(matches!(exhausted, Err(AgentError::Provider(_))));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn streaming_replays_full_content_in_chunks() {
        let provider = MockProvider::scripted(vec![MockProvider::response_with_reasoning(
            "a final answer that spans chunks",
            "short thought",
        )])
        .with_streaming();
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(64);

        let response = provider
            .generate_stream(&cancel, &[], tx, &GenerateOptions::default(), &[])
            .await
            .unwrap();

        let mut thinking = 0;
        let mut rebuilt = String::new();
        let mut saw_done = false;
        while let Some(chunk) = rx.recv().await {
            match chunk.kind {
                ChunkKind::Thinking => thinking += 1,
                ChunkKind::Content => rebuilt.push_str(&chunk.delta),
                ChunkKind::Done => saw_done = true,
                ChunkKind::Error => panic!("unexpected error chunk"),
            }
        }
        assert!(thinking > 0);
        assert!(saw_done);
        assert_eq!(rebuilt, response.message.content);
    }

    #[test]
    fn char_chunks_respects_boundaries() {
        let chunks = char_chunks("héllo wörld", 4);
        assert_eq!(chunks.concat(), "héllo wörld");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test]
    fn repeating_never_exhausts() {
        let provider = MockProvider::always_tool_call("echo", "{}");
        for _ in 0..5 {
            assert!(provider.next_response().is_ok());
        }
    }
}
