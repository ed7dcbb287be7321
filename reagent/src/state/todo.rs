//! Ordered task list with a pending/done/failed lifecycle.
//!
//! [`TodoManager`] is plain data; it lives inside the agent state's lock and
//! is also usable standalone. The [`std::fmt::Display`] rendering is what the
//! context builder injects as the plan message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::TodoError;

/// Task lifecycle. Transitions leave `Pending` exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Done,
    Failed,
}

/// One task on the plan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    /// Monotonically increasing from 1; the counter resets on clear.
    pub id: u64,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure reason, set by `fail`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Counts per status, in plan order of mention: pending, done, failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TodoStats {
    pub pending: usize,
    pub done: usize,
    pub failed: usize,
}

/// Ordered, mutable task list.
#[derive(Clone, Debug, Default)]
pub struct TodoManager {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TodoManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pending task and returns its id.
    pub fn add(&mut self, description: impl Into<String>, metadata: Option<Value>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.tasks.push(Task {
            id,
            description: description.into(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
            metadata,
        });
        id
    }

    /// Marks a pending task done. Closing a closed task is an error and
    /// leaves the list unchanged.
    pub fn complete(&mut self, id: u64) -> Result<(), TodoError> {
        self.close(id, TaskStatus::Done, None)
    }

    /// Marks a pending task failed with a reason.
    pub fn fail(&mut self, id: u64, reason: impl Into<String>) -> Result<(), TodoError> {
        self.close(id, TaskStatus::Failed, Some(reason.into()))
    }

    fn close(&mut self, id: u64, status: TaskStatus, error: Option<String>) -> Result<(), TodoError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TodoError::NotFound(id))?;
        if task.status != TaskStatus::Pending {
            return Err(TodoError::AlreadyClosed(id));
        }
        task.status = status;
        task.completed_at = Some(Utc::now());
        task.error = error;
        Ok(())
    }

    /// Drops all tasks and resets the id counter.
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.next_id = 0;
    }

    /// Copy of the task list.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn stats(&self) -> TodoStats {
        let mut stats = TodoStats::default();
        for task in &self.tasks {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Done => stats.done += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl fmt::Display for TodoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current plan:")?;
        for task in &self.tasks {
            let mark = match task.status {
                TaskStatus::Pending => "[ ]",
                TaskStatus::Done => "[✓]",
                TaskStatus::Failed => "[✗]",
            };
            writeln!(f, "{} {}. {}", mark, task.id, task.description)?;
            if task.status == TaskStatus::Failed {
                if let Some(reason) = &task.error {
                    writeln!(f, "    Error: {reason}")?;
                }
            }
        }
        let stats = self.stats();
        write!(
            f,
            "{} pending, {} done, {} failed",
            stats.pending, stats.done, stats.failed
        )
    }
}
