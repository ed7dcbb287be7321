//! Tool capability seam and its registry.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{RegistryError, ToolError};

/// Tool metadata exposed to the LLM: name, description, and a
/// JSON-Schema-shaped parameter object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments; `None` for parameterless tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Registration-time validation: non-empty name; when parameters are
    /// present they must describe a JSON object, and `required` (if any)
    /// must be an array of strings.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidDefinition(
                "tool name must not be empty".into(),
            ));
        }
        let Some(params) = &self.parameters else {
            return Ok(());
        };
        let Some(obj) = params.as_object() else {
            return Err(RegistryError::InvalidDefinition(format!(
                "tool '{}': parameters must be a JSON object",
                self.name
            )));
        };
        if obj.get("type").and_then(Value::as_str) != Some("object") {
            return Err(RegistryError::InvalidDefinition(format!(
                "tool '{}': parameters.type must be \"object\"",
                self.name
            )));
        }
        if let Some(required) = obj.get("required") {
            let ok = required
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string));
            if !ok {
                return Err(RegistryError::InvalidDefinition(format!(
                    "tool '{}': parameters.required must be an array of strings",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// A single callable tool: raw JSON text in, string out. Result strings are
/// surfaced verbatim as tool messages; errors become the message content and
/// never abort the turn.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Executes with the raw argument text from the model. Long-running
    /// tools are expected to honor `cancel`.
    async fn execute(&self, cancel: &CancellationToken, args: &str) -> Result<String, ToolError>;
}

/// Name→tool lookup with registration-time validation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the tool's definition and rejects duplicate names.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let def = tool.definition();
        def.validate()?;
        use dashmap::mapref::entry::Entry;
        match self.tools.entry(def.name.clone()) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate(def.name)),
            Entry::Vacant(slot) => {
                slot.insert(tool);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, RegistryError> {
        self.tools
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RegistryError::NotFound(format!("tool '{name}'")))
    }

    /// Full definition list for LLM tool exposure, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.iter().map(|entry| entry.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
