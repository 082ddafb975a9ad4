//! Compiler diagnostics and errors
//!
//! Distinguishes two failure classes:
//! - Malformed source: structured per-line diagnostics, always recoverable
//! - Toolchain faults: the front end itself is unusable; surfaced
//!   distinctly so the caller can disable the feature instead of retrying

use serde::{Deserialize, Serialize};

/// A single compiler-reported problem, anchored to a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-indexed source line
    pub line: usize,
    /// Human-readable message
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic at a line.
    #[inline]
    #[must_use]
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

/// Compilation failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// The source failed to build; carries one entry per reported error.
    #[error("compilation failed with {} error(s)", diagnostics.len())]
    Source {
        /// Per-line diagnostics, ordered by line
        diagnostics: Vec<Diagnostic>,
    },

    /// The compiler toolchain itself is unavailable or broken.
    #[error("compiler toolchain unavailable: {0}")]
    Toolchain(String),
}

impl CompileError {
    /// Diagnostics carried by a source failure (empty for toolchain faults).
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Source { diagnostics } => diagnostics,
            Self::Toolchain(_) => &[],
        }
    }

    /// Check whether this is the unrecoverable toolchain class.
    #[inline]
    #[must_use]
    pub fn is_toolchain(&self) -> bool {
        matches!(self, Self::Toolchain(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::new(12, "unexpected token");
        assert_eq!(diag.to_string(), "Line 12: unexpected token");
    }

    #[test]
    fn source_error_reports_count() {
        let err = CompileError::Source {
            diagnostics: vec![Diagnostic::new(1, "a"), Diagnostic::new(3, "b")],
        };
        assert!(err.to_string().contains("2 error(s)"));
        assert_eq!(err.diagnostics().len(), 2);
        assert!(!err.is_toolchain());
    }

    #[test]
    fn toolchain_error_is_distinct() {
        let err = CompileError::Toolchain("grammar missing".to_string());
        assert!(err.is_toolchain());
        assert!(err.diagnostics().is_empty());
    }
}
