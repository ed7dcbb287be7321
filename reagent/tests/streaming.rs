//! Streaming path: chunk events in real time, duplicate thinking
//! suppression, byte-for-byte parity with the synchronous path.

mod init_logging;

use std::sync::Arc;

use reagent::{
    ChainInput, Client, Cycle, CycleConfig, MockProvider, ModelDefinition, ModelRegistry,
    Subscriber, ToolRegistry,
};

fn cycle_with(provider: MockProvider, streaming: bool) -> Cycle {
    let models = Arc::new(ModelRegistry::new());
    models
        .register("mock", ModelDefinition::new("mock"), Arc::new(provider))
        .unwrap();
    Cycle::new(
        models,
        Arc::new(ToolRegistry::new()),
        CycleConfig {
            default_model: "mock".into(),
            timeout_secs: None,
            streaming,
            ..CycleConfig::default()
        },
    )
}

const CONTENT: &str = "a considered answer built from several streamed chunks";
const REASONING: &str = "weighing the options first";

/// Scenario: streaming and non-streaming paths produce the same final
/// result for the same provider script.
#[tokio::test]
async fn streamed_and_synchronous_results_match() {
    let sync_cycle = cycle_with(
        MockProvider::scripted(vec![MockProvider::response_with_reasoning(
            CONTENT, REASONING,
        )]),
        false,
    );
    let sync_out = sync_cycle
        .execute(ChainInput::new("q", sync_cycle.state()))
        .await
        .unwrap();

    let stream_cycle = cycle_with(
        MockProvider::scripted(vec![MockProvider::response_with_reasoning(
            CONTENT, REASONING,
        )])
        .with_streaming(),
        true,
    );
    let client = Client::new(Arc::new(stream_cycle));
    let mut subscriber = client.subscribe(256);
    let stream_out = client
        .cycle()
        .execute(ChainInput::new("q", client.state()))
        .await
        .unwrap();
    subscriber.close();

    assert_eq!(sync_out.result, stream_out.result);
    assert_eq!(stream_out.result, format!("{REASONING}\n\n{CONTENT}"));
}

/// Scenario: a streamed turn delivers thinking chunks in real time and
/// suppresses the duplicate whole-thinking event; the chunk deltas
/// reassemble the reasoning and content exactly.
#[tokio::test]
async fn streamed_turn_emits_chunks_not_whole_thinking() {
    let cycle = cycle_with(
        MockProvider::scripted(vec![MockProvider::response_with_reasoning(
            CONTENT, REASONING,
        )])
        .with_streaming(),
        true,
    );
    let client = Client::new(Arc::new(cycle));
    let mut subscriber = client.subscribe(256);

    client.run("q").await.unwrap();

    let mut kinds = Vec::new();
    let mut deltas = String::new();
    subscriber.close();
    while let Some(event) = subscriber.next_event().await {
        if let reagent::EventPayload::ThinkingChunk { delta, .. } = &event.payload {
            deltas.push_str(delta);
        }
        kinds.push(event.payload.kind().to_string());
    }

    assert!(kinds.contains(&"thinking_chunk".to_string()));
    assert!(!kinds.contains(&"thinking".to_string()));
    assert!(kinds.contains(&"message".to_string()));
    assert_eq!(kinds.last().map(String::as_str), Some("done"));
    assert_eq!(deltas, format!("{REASONING}{CONTENT}"));
}

/// Scenario: with streaming disabled the whole thinking arrives as one
/// event and no chunk events appear.
#[tokio::test]
async fn synchronous_turn_emits_whole_thinking() {
    let cycle = cycle_with(
        MockProvider::scripted(vec![MockProvider::response_with_reasoning(
            CONTENT, REASONING,
        )]),
        false,
    );
    let client = Client::new(Arc::new(cycle));
    let mut subscriber = client.subscribe(256);

    client.run("q").await.unwrap();
    subscriber.close();

    let mut kinds = Vec::new();
    while let Some(event) = subscriber.next_event().await {
        kinds.push(event.payload.kind().to_string());
    }
    assert!(kinds.contains(&"thinking".to_string()));
    assert!(!kinds.contains(&"thinking_chunk".to_string()));
}

/// Scenario: a streaming-capable provider with no emitter configured falls
/// back to the synchronous path and still succeeds.
#[tokio::test]
async fn streaming_without_emitter_falls_back() {
    let cycle = cycle_with(
        MockProvider::scripted(vec![MockProvider::response_with_reasoning(
            CONTENT, REASONING,
        )])
        .with_streaming(),
        true,
    );
    let out = cycle
        .execute(ChainInput::new("q", cycle.state()))
        .await
        .unwrap();
    assert_eq!(out.result, format!("{REASONING}\n\n{CONTENT}"));
}
