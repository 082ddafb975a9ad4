//! Spellforge compiler front end (spellforge-compile)
//!
//! Turns mod-script source text into an in-memory [`CompiledUnit`]:
//! - Syntax validation with per-line diagnostics
//! - Public top-level type extraction (capability markers, operations)
//! - Reference resolution against library search paths and the host's
//!   already-loaded libraries
//!
//! Compilation is pure: identical `(source, references)` inputs always
//! produce the same result, and nothing is written to persistent storage.

pub mod compiler;
pub mod diagnostics;
pub mod reference;
pub mod types;

pub use compiler::SourceCompiler;
pub use diagnostics::{CompileError, Diagnostic};
pub use reference::{LoadedLibraries, NoLibraries, ReferenceResolver, ReferenceSet, StaticLibraries};
pub use types::{CompiledUnit, OperationInfo, SourceUnit, TypeInfo};

/// Canonical suffix for mod-script source files.
pub const SOURCE_SUFFIX: &str = ".rs";

/// Canonical suffix for reference library files.
pub const LIBRARY_SUFFIX: &str = ".rlib";
