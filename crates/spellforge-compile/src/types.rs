//! Compiled-unit data model
//!
//! A successful compile yields a [`CompiledUnit`]: an ordered map from
//! declared type name to [`TypeInfo`]. Type metadata records capability
//! markers (implemented trait names), declared operations, and public
//! fields: everything the loader needs to pick an attachment strategy
//! without static knowledge of the host's type system.

use crate::diagnostics::{CompileError, Diagnostic};
use crate::reference::ReferenceSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A declared operation (method) on a script type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInfo {
    /// Operation name
    pub name: String,
    /// Whether the operation is callable from outside the type
    pub public: bool,
    /// Number of non-self parameters
    pub arity: usize,
}

impl OperationInfo {
    /// Create operation metadata.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, public: bool, arity: usize) -> Self {
        Self {
            name: name.into(),
            public,
            arity,
        }
    }
}

/// Metadata for one public top-level type declared in a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Declared type name
    pub name: String,
    /// 1-indexed declaration line
    pub line: usize,
    /// Implemented trait names, in declaration order (capability markers)
    pub bases: Vec<String>,
    /// Declared operations (inherent and trait-impl methods)
    pub operations: Vec<OperationInfo>,
    /// Public field names
    pub properties: Vec<String>,
}

impl TypeInfo {
    /// Create empty metadata for a named type.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
            bases: Vec::new(),
            operations: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Look up a declared operation by name.
    #[inline]
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OperationInfo> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Check whether the type declares an implementation of a named base.
    #[inline]
    #[must_use]
    pub fn has_base(&self, name: &str) -> bool {
        self.bases.iter().any(|b| b == name)
    }
}

/// The result of a successful compile: a type map plus any non-fatal
/// diagnostics (empty on success today; reserved for warnings).
///
/// Owned by the compile call that produced it and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledUnit {
    /// Declared public top-level types, in declaration order
    pub types: IndexMap<String, TypeInfo>,
    /// Non-fatal diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledUnit {
    /// Create a unit with no types and no diagnostics.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: IndexMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Look up a declared type.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    /// Iterate declared types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values()
    }

    /// Declared type names, in declaration order.
    #[must_use]
    pub fn type_names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }

    /// Number of declared types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check whether the unit declares no types.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A named, independently compiled piece of source code.
///
/// The compiled handle is tied to the exact source text: any edit clears
/// it, and recompilation always produces a fresh handle.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    name: String,
    source: String,
    compiled: Option<Arc<CompiledUnit>>,
}

impl SourceUnit {
    /// Create a unit from a logical name and source text.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            compiled: None,
        }
    }

    /// Read a unit from a source file; the logical name is the file stem.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, source))
    }

    /// Logical unit name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current source text.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled handle, if the current source has been compiled.
    #[inline]
    #[must_use]
    pub fn compiled(&self) -> Option<&Arc<CompiledUnit>> {
        self.compiled.as_ref()
    }

    /// Replace the source text, invalidating any compiled handle.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.compiled = None;
    }

    /// Compile the current source, storing and returning a fresh handle.
    pub fn compile(
        &mut self,
        compiler: &crate::compiler::SourceCompiler,
        references: &ReferenceSet,
    ) -> Result<Arc<CompiledUnit>, CompileError> {
        let unit = Arc::new(compiler.compile(&self.source, references)?);
        self.compiled = Some(Arc::clone(&unit));
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SourceCompiler;

    #[test]
    fn type_info_operation_lookup() {
        let mut info = TypeInfo::new("Fireball", 1);
        info.operations.push(OperationInfo::new("on_enable", true, 0));

        assert!(info.operation("on_enable").is_some());
        assert!(info.operation("update").is_none());
    }

    #[test]
    fn type_info_has_base() {
        let mut info = TypeInfo::new("Fireball", 1);
        info.bases.push("Behavior".to_string());

        assert!(info.has_base("Behavior"));
        assert!(!info.has_base("ModScript"));
    }

    #[test]
    fn source_unit_edit_invalidates_handle() {
        let compiler = SourceCompiler::new();
        let refs = ReferenceSet::new();
        let mut unit = SourceUnit::new("Empty", "pub struct Empty;");

        unit.compile(&compiler, &refs).unwrap();
        assert!(unit.compiled().is_some());

        unit.set_source("pub struct Empty { pub field: u32 }");
        assert!(unit.compiled().is_none());
    }

    #[test]
    fn source_unit_recompile_is_fresh_handle() {
        let compiler = SourceCompiler::new();
        let refs = ReferenceSet::new();
        let mut unit = SourceUnit::new("Empty", "pub struct Empty;");

        let first = unit.compile(&compiler, &refs).unwrap();
        let second = unit.compile(&compiler, &refs).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
