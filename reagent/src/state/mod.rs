//! Thread-safe agent state: conversation history, scratchpad files, plan,
//! generic values, and opaque collaborator handles.
//!
//! One [`AgentState`] is the only shared mutable object between concurrent
//! turns. Everything lives behind a single `tokio::sync::RwLock`: every read
//! takes the shared lock and returns a copy, every write takes the exclusive
//! lock, and [`AgentState::update`] is an atomic read-modify-write under the
//! exclusive lock. No lock is ever held across provider or tool I/O — callers
//! get owned data back.
//!
//! # Main types
//!
//! - [`AgentState`]: the keyed store plus typed history/files/todo operations
//!   and the context builders.
//! - [`FileMeta`]: scratchpad file metadata; `vision_description` is the
//!   "working memory" — the one-time textual analysis of a binary artifact
//!   that is injected into future context instead of re-sending the bytes.
//! - [`TodoManager`] (in [`todo`]): the plan rendered into context.

pub mod todo;

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::message::{Message, Role};

pub use todo::{Task, TaskStatus, TodoManager, TodoStats};

use crate::error::TodoError;

/// Marker line introducing the working-memory block inside a system message.
/// The non-vision filter locates this prefix and trims from it onward.
pub const WORKING_MEMORY_MARKER: &str = "## Working memory";

/// Metadata for one scratchpad file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Grouping tag, e.g. `"sketch"`.
    pub tag: String,
    /// Storage key for fetching the payload on demand.
    pub key: String,
    pub size: u64,
    pub filename: String,
    /// Working memory: textual analysis injected into future context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_tags: Vec<String>,
}

#[derive(Default)]
struct StateInner {
    history: Vec<Message>,
    files: BTreeMap<String, Vec<FileMeta>>,
    todo: TodoManager,
    values: HashMap<String, Value>,
    shared: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

/// Thread-safe keyed store feeding context construction.
///
/// Cheap to share: wrap in `Arc` and hand the same state to any number of
/// concurrent executions. History appends from concurrent turns interleave in
/// lock-acquisition order; readers never observe a torn write.
#[derive(Default)]
pub struct AgentState {
    inner: RwLock<StateInner>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    // --- generic keyed store ---

    /// Returns a copy of the value under `key`, or `None`.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().await.values.get(key).cloned()
    }

    pub async fn set(&self, key: impl Into<String>, value: Value) {
        self.inner.write().await.values.insert(key.into(), value);
    }

    /// Atomic read-modify-write under the exclusive lock. Returning `None`
    /// from the closure removes the key.
    pub async fn update<F>(&self, key: &str, f: F)
    where
        F: FnOnce(Option<Value>) -> Option<Value>,
    {
        let mut inner = self.inner.write().await;
        let current = inner.values.remove(key);
        if let Some(next) = f(current) {
            inner.values.insert(key.to_string(), next);
        }
    }

    /// Removes `key`; returns whether it was present.
    pub async fn remove(&self, key: &str) -> bool {
        self.inner.write().await.values.remove(key).is_some()
    }

    pub async fn exists(&self, key: &str) -> bool {
        self.inner.read().await.values.contains_key(key)
    }

    /// Sorted copy of the generic store's keys.
    pub async fn keys(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut keys: Vec<String> = inner.values.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Identifier of the session's primary subject, if set.
    pub async fn current_article(&self) -> Option<String> {
        self.get("current_article")
            .await
            .and_then(|v| v.as_str().map(str::to_string))
    }

    pub async fn set_current_article(&self, id: impl Into<String>) {
        self.set("current_article", Value::String(id.into())).await;
    }

    // --- opaque collaborator handles ---

    /// Stores an opaque collaborator handle (storage client, dictionaries,
    /// a registry) under `key`.
    pub async fn set_shared(&self, key: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        self.inner.write().await.shared.insert(key.into(), value);
    }

    /// Fetches a collaborator handle, downcast to its concrete type.
    pub async fn shared<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let handle = self.inner.read().await.shared.get(key)?.clone();
        handle.downcast::<T>().ok()
    }

    // --- history ---

    /// Appends one message. Appends from concurrent turns serialize on the
    /// exclusive lock in acquisition order.
    pub async fn append(&self, message: Message) {
        self.inner.write().await.history.push(message);
    }

    /// Defensive copy of the history; mutating it does not affect the store.
    pub async fn history(&self) -> Vec<Message> {
        self.inner.read().await.history.clone()
    }

    pub async fn last_message(&self) -> Option<Message> {
        self.inner.read().await.history.last().cloned()
    }

    pub async fn history_len(&self) -> usize {
        self.inner.read().await.history.len()
    }

    /// Bulk replacement for restoration. The new vector is staged in full by
    /// the caller and swapped under the exclusive lock, so no partially
    /// restored history is ever observable.
    pub async fn set_history(&self, history: Vec<Message>) {
        self.inner.write().await.history = history;
    }

    pub async fn clear_history(&self) {
        self.inner.write().await.history.clear();
    }

    // --- files ---

    /// Replaces the file list under `tag`.
    pub async fn set_files(&self, tag: impl Into<String>, files: Vec<FileMeta>) {
        self.inner.write().await.files.insert(tag.into(), files);
    }

    /// Deep copy of all file lists, keyed by tag.
    pub async fn files(&self) -> BTreeMap<String, Vec<FileMeta>> {
        self.inner.read().await.files.clone()
    }

    /// Replaces the matching entry with a copy carrying the new analysis.
    /// The substitution is atomic; readers see the old or the new entry,
    /// never a partial one. Returns whether a matching file existed.
    pub async fn update_file_analysis(
        &self,
        tag: &str,
        filename: &str,
        description: impl Into<String>,
    ) -> bool {
        let mut inner = self.inner.write().await;
        let Some(entries) = inner.files.get_mut(tag) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|f| f.filename == filename) else {
            return false;
        };
        let mut updated = entries[pos].clone();
        updated.vision_description = Some(description.into());
        entries[pos] = updated;
        true
    }

    // --- plan ---

    /// Adds a pending task to the plan and returns its id.
    pub async fn add_task(&self, description: impl Into<String>, metadata: Option<Value>) -> u64 {
        self.inner.write().await.todo.add(description, metadata)
    }

    pub async fn complete_task(&self, id: u64) -> Result<(), TodoError> {
        self.inner.write().await.todo.complete(id)
    }

    pub async fn fail_task(&self, id: u64, reason: impl Into<String>) -> Result<(), TodoError> {
        self.inner.write().await.todo.fail(id, reason)
    }

    pub async fn clear_tasks(&self) {
        self.inner.write().await.todo.clear();
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.inner.read().await.todo.tasks()
    }

    pub async fn todo_stats(&self) -> TodoStats {
        self.inner.read().await.todo.stats()
    }

    // --- context construction ---

    /// Builds the message sequence for the LLM: one system message
    /// (`system_prompt` plus the working-memory block when any file has an
    /// analysis), an optional plan message, then the full history in order.
    pub async fn build_context(&self, system_prompt: &str) -> Vec<Message> {
        let inner = self.inner.read().await;
        Self::assemble(&inner, system_prompt)
    }

    /// Like [`build_context`](Self::build_context), filtered for the target
    /// model. For a non-vision model the working-memory block is trimmed out
    /// of system messages and image payloads are stripped from every message.
    /// Stored messages are never mutated; filtering copies.
    pub async fn build_context_for_model(
        &self,
        system_prompt: &str,
        vision_capable: bool,
    ) -> Vec<Message> {
        let messages = self.build_context(system_prompt).await;
        if vision_capable {
            return messages;
        }
        messages
            .into_iter()
            .map(|mut msg| {
                if msg.role == Role::System {
                    msg.content = strip_working_memory(&msg.content);
                }
                msg.images.clear();
                msg
            })
            .collect()
    }

    fn assemble(inner: &StateInner, system_prompt: &str) -> Vec<Message> {
        let mut system = system_prompt.to_string();
        let block = working_memory_block(&inner.files);
        if !block.is_empty() {
            system.push_str("\n\n");
            system.push_str(WORKING_MEMORY_MARKER);
            system.push('\n');
            system.push_str(&block);
        }

        let mut messages = Vec::with_capacity(inner.history.len() + 2);
        messages.push(Message::system(system));
        if !inner.todo.is_empty() {
            messages.push(Message::system(inner.todo.to_string()));
        }
        messages.extend(inner.history.iter().cloned());
        messages
    }
}

/// One line per analyzed file: `- file [tag] filename: description`.
fn working_memory_block(files: &BTreeMap<String, Vec<FileMeta>>) -> String {
    let mut lines = Vec::new();
    for (tag, entries) in files {
        for file in entries {
            if let Some(desc) = &file.vision_description {
                lines.push(format!("- file [{tag}] {}: {desc}", file.filename));
            }
        }
    }
    lines.join("\n")
}

/// Trims a system message at the working-memory marker, dropping the block
/// and the blank line before it.
fn strip_working_memory(content: &str) -> String {
    match content.find(WORKING_MEMORY_MARKER) {
        Some(pos) => content[..pos].trim_end().to_string(),
        None => content.to_string(),
    }
}
