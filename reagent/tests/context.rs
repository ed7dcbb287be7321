//! What the provider actually receives: working memory, plan, and the
//! non-vision filter applied per model capability.

mod init_logging;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use reagent::{
    AgentError, ChainInput, Cycle, CycleConfig, FileMeta, GenerateOptions, LlmProvider, Message,
    ModelDefinition, ModelRegistry, ProviderResponse, ToolDefinition, ToolRegistry,
};

/// Records every message sequence it is invoked with.
struct CapturingProvider {
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
}

#[async_trait]
impl LlmProvider for CapturingProvider {
    async fn generate(
        &self,
        _cancel: &CancellationToken,
        messages: &[Message],
        _options: &GenerateOptions,
        _tools: &[ToolDefinition],
    ) -> Result<ProviderResponse, AgentError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok(ProviderResponse::new(Message::assistant("ok")))
    }
}

async fn seed_state(state: &reagent::AgentState) {
    state
        .set_files(
            "sketch",
            vec![FileMeta {
                tag: "sketch".into(),
                key: "k1".into(),
                size: 2048,
                filename: "wheel.png".into(),
                vision_description: Some("a bicycle wheel, front view".into()),
                extra_tags: vec![],
            }],
        )
        .await;
    state.add_task("identify the part", None).await;
    state
        .append(Message::user("earlier turn").with_images(vec!["data:image/png;base64,AA".into()]))
        .await;
}

fn cycle_for(model: &str, seen: Arc<Mutex<Vec<Vec<Message>>>>) -> Cycle {
    let models = Arc::new(ModelRegistry::new());
    models
        .register(
            model,
            ModelDefinition::new(model),
            Arc::new(CapturingProvider { seen }),
        )
        .unwrap();
    Cycle::new(
        models,
        Arc::new(ToolRegistry::new()),
        CycleConfig {
            default_model: model.into(),
            system_prompt: "You are a parts assistant.".into(),
            timeout_secs: None,
            streaming: false,
            ..CycleConfig::default()
        },
    )
}

/// Scenario: a non-vision model gets a filtered view — no working-memory
/// block, no image payloads — while the plan message survives.
#[tokio::test]
async fn non_vision_model_receives_filtered_context() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let cycle = cycle_for("mock", Arc::clone(&seen));
    seed_state(&cycle.state()).await;

    cycle
        .execute(ChainInput::new("which part is this", cycle.state()))
        .await
        .unwrap();

    let captured = seen.lock().unwrap();
    let messages = &captured[0];
    assert!(messages[0].content.starts_with("You are a parts assistant."));
    assert!(!messages[0].content.contains("Working memory"));
    assert!(messages[1].content.contains("identify the part"));
    assert!(messages.iter().all(|m| m.images.is_empty()));
}

/// Scenario: a vision-marked model gets the working-memory block and the
/// stored images untouched.
#[tokio::test]
async fn vision_model_receives_full_context() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let cycle = cycle_for("mock-vision", Arc::clone(&seen));
    seed_state(&cycle.state()).await;

    cycle
        .execute(ChainInput::new("which part is this", cycle.state()))
        .await
        .unwrap();

    let captured = seen.lock().unwrap();
    let messages = &captured[0];
    assert!(messages[0]
        .content
        .contains("- file [sketch] wheel.png: a bicycle wheel, front view"));
    assert!(messages.iter().any(|m| !m.images.is_empty()));
}
