//! Cycle configuration.
//!
//! Plain serde-deserializable struct so applications can embed it in their
//! own config files; [`CycleConfig::from_env`] covers the env-only path
//! (after a best-effort `.env` load).

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Static configuration for one cycle template.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Base system prompt for every turn.
    pub system_prompt: String,
    /// Default model name; must be registered in the model registry.
    pub default_model: String,
    /// Name treated as vision-capable regardless of registry flags.
    pub default_vision_model: String,
    pub max_iterations: u32,
    /// Turn deadline in seconds; `None` disables it.
    pub timeout_secs: Option<u64>,
    /// Initial value of the streaming runtime default.
    pub streaming: bool,
    /// Initial debug trace directory; `None` disables recording.
    pub debug_dir: Option<PathBuf>,
    /// Character cap for recorded tool arguments and results.
    pub trace_truncate_at: Option<usize>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            default_model: String::new(),
            default_vision_model: String::new(),
            max_iterations: 10,
            timeout_secs: Some(300),
            streaming: true,
            debug_dir: None,
            trace_truncate_at: Some(4000),
        }
    }
}

impl CycleConfig {
    /// Reads `REAGENT_*` variables over the defaults. Unset variables keep
    /// their defaults; unparsable numeric values are ignored with a warning.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let mut config = Self::default();

        if let Ok(prompt) = std::env::var("REAGENT_SYSTEM_PROMPT") {
            config.system_prompt = prompt;
        }
        if let Ok(model) = std::env::var("REAGENT_MODEL") {
            config.default_model = model;
        }
        if let Ok(model) = std::env::var("REAGENT_VISION_MODEL") {
            config.default_vision_model = model;
        }
        if let Some(n) = parse_var("REAGENT_MAX_ITERATIONS") {
            config.max_iterations = n;
        }
        if let Some(secs) = parse_var::<u64>("REAGENT_TIMEOUT_SECS") {
            config.timeout_secs = (secs > 0).then_some(secs);
        }
        if let Ok(flag) = std::env::var("REAGENT_STREAMING") {
            config.streaming = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Ok(dir) = std::env::var("REAGENT_DEBUG_DIR") {
            config.debug_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(cap) = parse_var::<usize>("REAGENT_TRACE_TRUNCATE_AT") {
            config.trace_truncate_at = (cap > 0).then_some(cap);
        }
        config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring unparsable {name}={raw}");
            None
        }
    }
}
