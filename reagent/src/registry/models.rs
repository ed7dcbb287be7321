//! Model registry: name → (provider, model definition).

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::provider::LlmProvider;

/// Name fragment that flags an entry as vision-capable regardless of its
/// explicit `vision` flag.
const VISION_NAME_MARKER: &str = "vision";

/// Generation defaults and capabilities for one registered model.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(default)]
    pub vision: bool,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_vision(mut self, vision: bool) -> Self {
        self.vision = vision;
        self
    }
}

struct ModelEntry {
    definition: ModelDefinition,
    provider: Arc<dyn LlmProvider>,
}

/// Name→(provider, definition) lookup. Registration in the startup phase,
/// lookups over the whole runtime.
#[derive(Default)]
pub struct ModelRegistry {
    models: DashMap<String, ModelEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model under `name`; duplicates are rejected.
    pub fn register(
        &self,
        name: impl Into<String>,
        definition: ModelDefinition,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidDefinition(
                "model name must not be empty".into(),
            ));
        }
        use dashmap::mapref::entry::Entry;
        match self.models.entry(name.clone()) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate(name)),
            Entry::Vacant(slot) => {
                slot.insert(ModelEntry {
                    definition,
                    provider,
                });
                Ok(())
            }
        }
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Result<(Arc<dyn LlmProvider>, ModelDefinition), RegistryError> {
        self.models
            .get(name)
            .map(|entry| (Arc::clone(&entry.provider), entry.definition.clone()))
            .ok_or_else(|| RegistryError::NotFound(format!("model '{name}'")))
    }

    /// Returns the requested entry, falling back to `default` when the
    /// requested name is absent. Errs only when neither exists.
    pub fn get_with_fallback(
        &self,
        requested: &str,
        default: &str,
    ) -> Result<(Arc<dyn LlmProvider>, ModelDefinition), RegistryError> {
        match self.get(requested) {
            Ok(found) => Ok(found),
            Err(_) => self.get(default).map_err(|_| {
                RegistryError::NotFound(format!(
                    "model '{requested}' (fallback '{default}' also unregistered)"
                ))
            }),
        }
    }

    /// A model is treated as vision-capable when it is the configured default
    /// vision model, when its entry flags vision, or when its name carries
    /// the vision marker.
    pub fn is_vision_model(&self, name: &str, default_vision: &str) -> bool {
        if !default_vision.is_empty() && name == default_vision {
            return true;
        }
        match self.models.get(name) {
            Some(entry) => {
                entry.definition.vision || entry.definition.name.contains(VISION_NAME_MARKER)
            }
            None => name.contains(VISION_NAME_MARKER),
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
