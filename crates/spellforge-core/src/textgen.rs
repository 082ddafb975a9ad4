//! Text-generation collaborator
//!
//! The core depends on one signature: a prompt goes in, text comes out.
//! Responses are sometimes fenced in markdown code blocks and sometimes
//! loosely structured `"field": "value"` pairs, so this module also owns
//! the tolerant response-shaping helpers: strict JSON parsing first,
//! quoted-field scanning as the fallback.

use async_trait::async_trait;
use std::time::Duration;

/// Text-generation failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeneratorError {
    /// The call did not complete within its timeout
    #[error("generation timed out")]
    Timeout,

    /// The generator endpoint could not be reached
    #[error("generator unreachable: {0}")]
    Unreachable(String),

    /// The generator answered with a non-success status
    #[error("generator returned status {0}")]
    Status(u16),
}

/// External text generator.
///
/// Implementations own transport, authentication, and configuration; the
/// core never sees any of it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt within a timeout.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GeneratorError>;
}

/// Canned keyword-matched responder.
///
/// Serves as the degraded offline behavior when no real generator is
/// configured, and doubles as a scriptable collaborator in tests: rules
/// are checked in insertion order and the first prompt-substring match
/// wins.
#[derive(Debug, Clone, Default)]
pub struct StaticResponder {
    rules: Vec<(String, String)>,
    fallback: String,
}

impl StaticResponder {
    /// Create a responder with no rules and an empty fallback.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule: prompts containing `needle` answer with `response`.
    #[must_use]
    pub fn on(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    /// Set the answer for prompts no rule matches.
    #[must_use]
    pub fn otherwise(mut self, response: impl Into<String>) -> Self {
        self.fallback = response.into();
        self
    }

    /// Canned offline defaults: a plausible analysis, filename list, and
    /// script body so the pipeline stays demonstrable without a backend.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .on(
                "code modification",
                "{\n\"target_system\": \"player\",\n\"change\": \"increase movement speed\",\n\"rationale\": \"make gameplay faster\"\n}",
            )
            .on("filenames", "PlayerController.rs\nEnemyBrain.rs\nMovementSystem.rs")
            .on(
                "new mod script",
                "{\n\"script_name\": \"FireballSpell\",\n\"functionality\": \"Launches a fireball that damages enemies\"\n}",
            )
            .otherwise(
                "use engine::prelude::*;\n\npub struct FireballSpell {\n    pub damage: f32,\n    pub speed: f32,\n}\n\nimpl Behavior for FireballSpell {\n    fn update(&mut self) {}\n}\n",
            )
    }
}

#[async_trait]
impl TextGenerator for StaticResponder {
    async fn generate(&self, prompt: &str, _timeout: Duration) -> Result<String, GeneratorError> {
        for (needle, response) in &self.rules {
            if prompt.contains(needle.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(self.fallback.clone())
    }
}

/// Call a generator under a watchdog timeout.
///
/// A collaborator that hangs past `timeout` is reported as
/// [`GeneratorError::Timeout`] instead of wedging the caller.
pub async fn generate_with_watchdog(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<String, GeneratorError> {
    match tokio::time::timeout(timeout, generator.generate(prompt, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(GeneratorError::Timeout),
    }
}

/// Extract a named field from a loosely structured response.
///
/// Tries strict JSON first; on malformed JSON falls back to locating the
/// quoted field name and taking the next quoted string after it.
#[must_use]
pub fn extract_field(response: &str, field: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(response) {
        if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
            return Some(text.to_string());
        }
    }

    let marker = format!("\"{field}\"");
    let start = response.find(&marker)? + marker.len();
    let rest = &response[start..];
    let open = rest.find('"')?;
    let after_open = &rest[open + 1..];
    let close = after_open.find('"')?;
    let value = &after_open[..close];
    (!value.is_empty()).then(|| value.to_string())
}

/// Strip markdown code fencing from a response, returning the inner code.
///
/// Text without fences is returned trimmed and untouched.
#[must_use]
pub fn strip_code_fences(response: &str) -> String {
    if !response.contains("```") {
        return response.trim().to_string();
    }

    let Some(fence) = response.find("```") else {
        return response.trim().to_string();
    };
    let after_fence = &response[fence + 3..];
    // Skip the info string ("rust", "rs", ...) on the fence line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];

    match body.rfind("```") {
        Some(end) => body[..end].trim().to_string(),
        None => body.trim().to_string(),
    }
}
