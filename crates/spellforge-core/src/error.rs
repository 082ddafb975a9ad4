//! Error taxonomy for the orchestration layer
//!
//! Every variant is recoverable from the host's point of view: the
//! orchestrator boundary turns all of them into human-readable summary
//! strings. The one distinct case is a compile-toolchain fault, which
//! callers should treat as "disable the feature" rather than retry
//! (see [`ForgeError::is_toolchain_fault`]).

use crate::textgen::GeneratorError;
use spellforge_compile::CompileError;
use spellforge_runtime::LoadError;

/// Orchestration-layer error.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    /// Source failed to build
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// No relevant files could be located for a modification target
    #[error("resolution error: {0}")]
    Resolution(String),

    /// A compiled unit could not be instantiated by any strategy
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// The per-session modification cap is reached
    #[error("modification budget exhausted")]
    BudgetExceeded,

    /// A modification run is already in flight
    #[error("a code change is already being processed")]
    AlreadyProcessing,

    /// The text generator is unreachable, timed out, or errored
    #[error("text generation failed: {0}")]
    ExternalCall(#[from] GeneratorError),

    /// Filesystem failure (backup or apply)
    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl ForgeError {
    /// Check whether this is the unrecoverable toolchain class that should
    /// disable the feature instead of being retried.
    #[inline]
    #[must_use]
    pub fn is_toolchain_fault(&self) -> bool {
        matches!(self, Self::Compile(e) if e.is_toolchain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolchain_fault_is_distinct() {
        let err = ForgeError::Compile(CompileError::Toolchain("gone".to_string()));
        assert!(err.is_toolchain_fault());

        let err = ForgeError::Compile(CompileError::Source {
            diagnostics: vec![],
        });
        assert!(!err.is_toolchain_fault());
    }

    #[test]
    fn generator_error_converts() {
        let err: ForgeError = GeneratorError::Timeout.into();
        assert!(err.to_string().contains("text generation failed"));
    }
}
