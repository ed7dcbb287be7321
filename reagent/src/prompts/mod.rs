//! Post-prompt loading seam.
//!
//! A post-prompt is an alternate system prompt plus optional model-parameter
//! overrides, activated for the iteration following a particular tool's
//! execution so the model interprets that tool's result under different
//! instructions. Disk-backed loaders are external collaborators; the crate
//! ships [`StaticPromptLoader`], an in-memory map that doubles as the test
//! fixture.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::AgentError;

/// Runtime overrides carried by a post-prompt.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PostPromptConfig {
    /// Disabled post-prompts are loaded but never activated.
    pub enabled: bool,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: Option<String>,
}

impl Default for PostPromptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            temperature: None,
            max_tokens: None,
            response_format: None,
        }
    }
}

/// Alternate system prompt plus overrides for one follow-up iteration.
#[derive(Clone, Debug, Deserialize)]
pub struct PostPrompt {
    pub system_prompt: String,
    #[serde(default)]
    pub config: PostPromptConfig,
}

impl PostPrompt {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            config: PostPromptConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PostPromptConfig) -> Self {
        self.config = config;
        self
    }
}

/// Loader seam: which post-prompt, if any, is bound to a tool name.
pub trait PromptLoader: Send + Sync {
    /// `Ok(None)` means the tool has no post-prompt.
    fn load_tool_post_prompt(&self, tool_name: &str) -> Result<Option<PostPrompt>, AgentError>;
}

/// In-memory tool→post-prompt map.
#[derive(Default)]
pub struct StaticPromptLoader {
    prompts: HashMap<String, PostPrompt>,
}

impl StaticPromptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, tool_name: impl Into<String>, prompt: PostPrompt) -> Self {
        self.prompts.insert(tool_name.into(), prompt);
        self
    }
}

impl PromptLoader for StaticPromptLoader {
    fn load_tool_post_prompt(&self, tool_name: &str) -> Result<Option<PostPrompt>, AgentError> {
        Ok(self.prompts.get(tool_name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_loader_returns_bound_prompt_or_none() {
        let loader = StaticPromptLoader::new().insert(
            "fetch_image",
            PostPrompt::new("Describe the fetched image in detail.").with_config(PostPromptConfig {
                model: Some("vision-large".into()),
                ..Default::default()
            }),
        );

        let found = loader.load_tool_post_prompt("fetch_image").unwrap().unwrap();
        assert_eq!(found.config.model.as_deref(), Some("vision-large"));
        assert!(found.config.enabled);
        assert!(loader.load_tool_post_prompt("other").unwrap().is_none());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PostPromptConfig = serde_json::from_str(r#"{"temperature": 0.1}"#).unwrap();
        assert!(config.enabled);
        assert_eq!(config.temperature, Some(0.1));
        assert!(config.model.is_none());
    }
}
