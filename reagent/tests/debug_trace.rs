//! Debug trace documents over whole turns, and post-prompt activation as
//! observed through the recorded requests.

mod init_logging;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use reagent::{
    ChainInput, Cycle, CycleConfig, MockProvider, ModelDefinition, ModelRegistry, PostPrompt,
    PostPromptConfig, StaticPromptLoader, Tool, ToolDefinition, ToolError, ToolRegistry,
};

struct SketchTool;

#[async_trait]
impl Tool for SketchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("fetch_sketch", "Fetches a sketch for analysis")
    }

    async fn execute(&self, _cancel: &CancellationToken, _args: &str) -> Result<String, ToolError> {
        Ok("sketch bytes fetched".into())
    }
}

fn cycle_with(provider: MockProvider, debug_dir: std::path::PathBuf) -> Cycle {
    let models = Arc::new(ModelRegistry::new());
    models
        .register("mock", ModelDefinition::new("mock"), Arc::new(provider))
        .unwrap();
    let tools = Arc::new(ToolRegistry::new());
    tools.register(Arc::new(SketchTool)).unwrap();
    Cycle::new(
        models,
        tools,
        CycleConfig {
            default_model: "mock".into(),
            timeout_secs: None,
            streaming: false,
            debug_dir: Some(debug_dir),
            ..CycleConfig::default()
        },
    )
}

/// Scenario: a tool turn with recording on writes one JSON document whose
/// iterations, tools and summary match what happened.
#[tokio::test]
async fn turn_writes_trace_document() {
    let dir = tempfile::tempdir().unwrap();
    let cycle = cycle_with(
        MockProvider::first_tool_then_final("fetch_sketch", "{}", "all done"),
        dir.path().to_path_buf(),
    );

    let out = cycle
        .execute(ChainInput::new("fetch it", cycle.state()))
        .await
        .unwrap();

    let path = out.debug_log_path.expect("trace path in output");
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(doc["user_query"], "fetch it");
    assert_eq!(doc["final_result"], "all done");
    assert!(doc["run_id"].as_str().unwrap().len() >= 32);

    let iterations = doc["iterations"].as_array().unwrap();
    assert_eq!(iterations.len(), 2);
    assert_eq!(iterations[0]["llm_request"]["model"], "mock");
    assert_eq!(iterations[0]["llm_request"]["system_prompt_used"], "base");
    assert_eq!(
        iterations[0]["llm_response"]["tool_calls"][0]["name"],
        "fetch_sketch"
    );
    assert_eq!(
        iterations[0]["tools_executed"][0]["result"],
        "sketch bytes fetched"
    );
    assert_eq!(iterations[0]["tools_executed"][0]["success"], true);
    assert_eq!(iterations[1]["is_final"], true);

    assert_eq!(doc["summary"]["total_llm_calls"], 2);
    assert_eq!(doc["summary"]["total_tools_executed"], 1);
    assert_eq!(doc["summary"]["visited_tools"][0], "fetch_sketch");
}

/// Scenario: the post-prompt bound to the executed tool steers the next
/// iteration — recorded as post_prompt usage with its overrides applied.
#[tokio::test]
async fn tool_post_prompt_applies_to_next_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let cycle = cycle_with(
        MockProvider::first_tool_then_final("fetch_sketch", "{}", "a red bicycle"),
        dir.path().to_path_buf(),
    )
    .with_prompt_loader(Arc::new(StaticPromptLoader::new().insert(
        "fetch_sketch",
        PostPrompt::new("Describe the fetched sketch precisely.").with_config(PostPromptConfig {
            temperature: Some(0.9),
            max_tokens: Some(256),
            ..Default::default()
        }),
    )));

    let out = cycle
        .execute(ChainInput::new("what is on the sketch", cycle.state()))
        .await
        .unwrap();

    let path = out.debug_log_path.unwrap();
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let iterations = doc["iterations"].as_array().unwrap();

    assert_eq!(iterations[0]["llm_request"]["system_prompt_used"], "base");
    assert_eq!(
        iterations[1]["llm_request"]["system_prompt_used"],
        "post_prompt"
    );
    let temperature = iterations[1]["llm_request"]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.9).abs() < 1e-6);
    assert_eq!(iterations[1]["llm_request"]["max_tokens"], 256);
}

/// Scenario: a disabled post-prompt is never activated.
#[tokio::test]
async fn disabled_post_prompt_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let cycle = cycle_with(
        MockProvider::first_tool_then_final("fetch_sketch", "{}", "plain"),
        dir.path().to_path_buf(),
    )
    .with_prompt_loader(Arc::new(StaticPromptLoader::new().insert(
        "fetch_sketch",
        PostPrompt::new("unused").with_config(PostPromptConfig {
            enabled: false,
            ..Default::default()
        }),
    )));

    let out = cycle
        .execute(ChainInput::new("q", cycle.state()))
        .await
        .unwrap();

    let path = out.debug_log_path.unwrap();
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        doc["iterations"][1]["llm_request"]["system_prompt_used"],
        "base"
    );
}

/// Scenario: an aborted turn still writes a document with the error set.
#[tokio::test]
async fn failed_turn_writes_trace_with_error() {
    let dir = tempfile::tempdir().unwrap();
    // Script runs dry on the second call.
    let cycle = cycle_with(
        MockProvider::scripted(vec![reagent::ProviderResponse::new(
            reagent::Message::assistant_with_tool_calls(
                "",
                vec![reagent::ToolCall::new("c1", "fetch_sketch", "{}")],
            ),
        )]),
        dir.path().to_path_buf(),
    );

    cycle
        .execute(ChainInput::new("q", cycle.state()))
        .await
        .unwrap_err();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let path = entries[0].as_ref().unwrap().path();
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert!(doc["error"].as_str().unwrap().contains("provider error"));
    assert!(doc["summary"]["errors"].as_array().unwrap().len() >= 1);
}
