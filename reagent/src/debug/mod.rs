//! Debug trace recording: one JSON document per run.
//!
//! The recorder buffers a run under a mutex while steps feed it request,
//! response and tool frames; [`DebugObserver`] adapts it onto the executor's
//! lifecycle so the file is finalized exactly once, on finish, success or
//! not. Large tool arguments and results are truncated with a documented
//! suffix when a cap is configured.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::chain::observer::ExecutionObserver;
use crate::chain::ChainOutput;
use crate::error::AgentError;
use crate::message::ToolCall;

/// Suffix appended to truncated arguments and results.
pub const TRUNCATED_SUFFIX: &str = "... [truncated]";

/// The LLM request side of one iteration frame.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LlmRequestTrace {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Which system prompt was in effect: `"base"` or `"post_prompt"`.
    pub system_prompt_used: String,
    pub messages_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ToolCallTrace {
    pub id: String,
    pub name: String,
    pub args: String,
}

impl From<&ToolCall> for ToolCallTrace {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            args: call.arguments.clone(),
        }
    }
}

/// The LLM response side of one iteration frame.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LlmResponseTrace {
    pub content: String,
    pub tool_calls: Vec<ToolCallTrace>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One executed tool within an iteration.
#[derive(Clone, Debug, Serialize)]
pub struct ToolTrace {
    pub name: String,
    pub args: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_truncated: Option<bool>,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct IterationTrace {
    pub iteration: u32,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_request: Option<LlmRequestTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_response: Option<LlmResponseTrace>,
    pub tools_executed: Vec<ToolTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub total_llm_calls: usize,
    pub total_tools_executed: usize,
    pub total_llm_duration_ms: u64,
    pub total_tool_duration_ms: u64,
    pub errors: Vec<String>,
    pub visited_tools: Vec<String>,
}

/// The whole run document, written once on finish.
#[derive(Clone, Debug, Serialize)]
pub struct RunTrace {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_query: String,
    pub duration_ms: u64,
    pub iterations: Vec<IterationTrace>,
    pub summary: RunSummary,
    pub final_result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Default)]
struct RecorderInner {
    user_query: String,
    run_started: Option<Instant>,
    iteration_started: Option<Instant>,
    current: Option<IterationTrace>,
    iterations: Vec<IterationTrace>,
}

/// Buffers one run's trace and writes `<dir>/run-<run_id>.json` on finish.
pub struct DebugRecorder {
    run_id: String,
    path: PathBuf,
    truncate_at: Option<usize>,
    inner: Mutex<RecorderInner>,
}

impl DebugRecorder {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let run_id = Uuid::new_v4().to_string();
        let path = dir.as_ref().join(format!("run-{run_id}.json"));
        Self {
            run_id,
            path,
            truncate_at: None,
            inner: Mutex::new(RecorderInner::default()),
        }
    }

    /// Caps recorded tool arguments and results at `chars`.
    pub fn with_truncate_at(mut self, chars: usize) -> Self {
        self.truncate_at = Some(chars);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Where the trace document will be written. Known up front so the
    /// output can reference it before the file exists.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start_run(&self, user_query: &str) {
        let mut inner = self.inner.lock().expect("recorder lock");
        inner.user_query = user_query.to_string();
        inner.run_started = Some(Instant::now());
    }

    pub fn start_iteration(&self, iteration: u32) {
        let mut inner = self.inner.lock().expect("recorder lock");
        inner.iteration_started = Some(Instant::now());
        inner.current = Some(IterationTrace {
            iteration,
            ..IterationTrace::default()
        });
    }

    pub fn record_llm_request(&self, request: LlmRequestTrace) {
        let mut inner = self.inner.lock().expect("recorder lock");
        if let Some(frame) = inner.current.as_mut() {
            frame.llm_request = Some(request);
        }
    }

    pub fn record_llm_response(&self, response: LlmResponseTrace) {
        let mut inner = self.inner.lock().expect("recorder lock");
        if let Some(frame) = inner.current.as_mut() {
            frame.llm_response = Some(response);
        }
    }

    pub fn record_tool(&self, mut tool: ToolTrace) {
        tool.args = self.truncate(tool.args);
        let over_cap = self
            .truncate_at
            .is_some_and(|cap| tool.result.chars().count() > cap);
        if over_cap {
            tool.result = self.truncate(tool.result);
            tool.result_truncated = Some(true);
        }

        let mut inner = self.inner.lock().expect("recorder lock");
        if let Some(frame) = inner.current.as_mut() {
            frame.tools_executed.push(tool);
        }
    }

    pub fn end_iteration(&self) {
        let mut inner = self.inner.lock().expect("recorder lock");
        let elapsed = inner
            .iteration_started
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        if let Some(mut frame) = inner.current.take() {
            frame.duration_ms = elapsed;
            inner.iterations.push(frame);
        }
    }

    /// Finalizes the document and writes it. The open iteration frame, if
    /// any, is closed first so error paths lose nothing.
    pub fn finish(
        &self,
        final_result: &str,
        error: Option<&AgentError>,
    ) -> std::io::Result<PathBuf> {
        self.end_iteration();

        let mut inner = self.inner.lock().expect("recorder lock");
        let duration_ms = inner
            .run_started
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        let mut iterations = std::mem::take(&mut inner.iterations);
        if error.is_none() {
            if let Some(last) = iterations.last_mut() {
                last.is_final = Some(true);
            }
        }

        let trace = RunTrace {
            run_id: self.run_id.clone(),
            timestamp: Utc::now(),
            user_query: std::mem::take(&mut inner.user_query),
            duration_ms,
            summary: summarize(&iterations, error),
            iterations,
            final_result: final_result.to_string(),
            error: error.map(|e| e.to_string()),
        };
        drop(inner);

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&trace).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, json)?;
        Ok(self.path.clone())
    }

    fn truncate(&self, text: String) -> String {
        match self.truncate_at {
            Some(cap) if text.chars().count() > cap => {
                let cut: String = text.chars().take(cap).collect();
                format!("{cut}{TRUNCATED_SUFFIX}")
            }
            _ => text,
        }
    }
}

fn summarize(iterations: &[IterationTrace], run_error: Option<&AgentError>) -> RunSummary {
    let mut summary = RunSummary::default();
    for frame in iterations {
        if let Some(response) = &frame.llm_response {
            summary.total_llm_calls += 1;
            summary.total_llm_duration_ms += response.duration_ms;
            if let Some(err) = &response.error {
                summary.errors.push(err.clone());
            }
        }
        for tool in &frame.tools_executed {
            summary.total_tools_executed += 1;
            summary.total_tool_duration_ms += tool.duration_ms;
            if let Some(err) = &tool.error {
                summary.errors.push(err.clone());
            }
            if !summary.visited_tools.contains(&tool.name) {
                summary.visited_tools.push(tool.name.clone());
            }
        }
    }
    if let Some(err) = run_error {
        summary.errors.push(err.to_string());
    }
    summary
}

/// Adapts the recorder onto the executor lifecycle.
pub struct DebugObserver {
    recorder: Arc<DebugRecorder>,
}

impl DebugObserver {
    pub fn new(recorder: Arc<DebugRecorder>) -> Self {
        Self { recorder }
    }
}

#[async_trait]
impl ExecutionObserver for DebugObserver {
    async fn on_start(&self, query: &str) {
        self.recorder.start_run(query);
    }

    async fn on_iteration_start(&self, iteration: u32) {
        self.recorder.start_iteration(iteration);
    }

    async fn on_iteration_end(&self, _iteration: u32) {
        self.recorder.end_iteration();
    }

    async fn on_finish(&self, output: Option<&ChainOutput>, error: Option<&AgentError>) {
        let result = output.map(|o| o.result.as_str()).unwrap_or_default();
        if let Err(err) = self.recorder.finish(result, error) {
            tracing::warn!("failed to write debug trace: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_trace(name: &str, result: &str) -> ToolTrace {
        ToolTrace {
            name: name.into(),
            args: "{}".into(),
            result: result.into(),
            result_truncated: None,
            duration_ms: 2,
            success: true,
            error: None,
        }
    }

    #[test]
    fn finish_writes_document_with_summary() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = DebugRecorder::new(dir.path());
        recorder.start_run("what time is it");
        recorder.start_iteration(1);
        recorder.record_llm_request(LlmRequestTrace {
            model: "m".into(),
            system_prompt_used: "base".into(),
            messages_count: 2,
            ..Default::default()
        });
        recorder.record_llm_response(LlmResponseTrace {
            content: "checking".into(),
            duration_ms: 12,
            ..Default::default()
        });
        recorder.record_tool(tool_trace("clock", "10:00"));
        recorder.end_iteration();
        recorder.start_iteration(2);
        recorder.record_llm_response(LlmResponseTrace {
            content: "it is 10:00".into(),
            duration_ms: 8,
            ..Default::default()
        });
        recorder.end_iteration();

        let path = recorder.finish("it is 10:00", None).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(doc["user_query"], "what time is it");
        assert_eq!(doc["iterations"].as_array().unwrap().len(), 2);
        assert_eq!(doc["iterations"][1]["is_final"], true);
        assert_eq!(doc["summary"]["total_llm_calls"], 2);
        assert_eq!(doc["summary"]["total_tools_executed"], 1);
        assert_eq!(doc["summary"]["visited_tools"][0], "clock");
        assert_eq!(doc["final_result"], "it is 10:00");
        assert!(doc.get("error").is_none());
    }

    #[test]
    fn truncation_appends_suffix_and_flags_result() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = DebugRecorder::new(dir.path()).with_truncate_at(10);
        recorder.start_run("q");
        recorder.start_iteration(1);
        recorder.record_tool(tool_trace("big", &"x".repeat(50)));
        recorder.end_iteration();

        let path = recorder.finish("", None).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let tool = &doc["iterations"][0]["tools_executed"][0];
        assert_eq!(
            tool["result"].as_str().unwrap(),
            format!("{}{TRUNCATED_SUFFIX}", "x".repeat(10))
        );
        assert_eq!(tool["result_truncated"], true);
    }

    #[test]
    fn error_finish_records_error_and_skips_is_final() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = DebugRecorder::new(dir.path());
        recorder.start_run("q");
        recorder.start_iteration(1);

        let err = AgentError::Provider("rate limited".into());
        let path = recorder.finish("", Some(&err)).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert!(doc["error"].as_str().unwrap().contains("rate limited"));
        assert!(doc["iterations"][0].get("is_final").is_none());
        assert!(!doc["summary"]["errors"].as_array().unwrap().is_empty());
    }
}
