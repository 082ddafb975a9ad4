//! Type-capability queries
//!
//! The loader never compares static types; it asks these three questions
//! about a type's metadata. The default implementation walks implemented
//! base names through a host-supplied ancestry table, because the engine
//! or framework base a script extends may live in a library this process
//! is not statically linked against. Test doubles can simulate "framework
//! present" and "framework absent" by varying the table.

use crate::{ENGINE_BEHAVIOR_BASE, FRAMEWORK_SCRIPT_BASE};
use spellforge_compile::TypeInfo;
use std::collections::{HashMap, HashSet};

/// Capability queries over compiled type metadata.
pub trait TypeCapabilities: Send + Sync {
    /// Can the host attach this type to a scene entity as behavior?
    fn is_component_type(&self, ty: &TypeInfo) -> bool;

    /// Does this type implement the mod framework's scripting base,
    /// detected structurally (by name), not by static reference?
    fn is_framework_script_type(&self, ty: &TypeInfo) -> bool;

    /// Does the type declare a named operation?
    fn has_operation(&self, ty: &TypeInfo, operation: &str) -> bool {
        ty.operation(operation).is_some()
    }
}

/// Name-chain capability detection.
///
/// A type's implemented base names are walked through the ancestry table
/// (`name -> parent name`) until a configured engine or framework base is
/// reached or the chain ends.
#[derive(Debug, Clone)]
pub struct NameChainCapabilities {
    component_bases: HashSet<String>,
    script_bases: HashSet<String>,
    ancestry: HashMap<String, String>,
}

impl Default for NameChainCapabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl NameChainCapabilities {
    /// Create with the default engine/framework base names and an empty
    /// ancestry table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            component_bases: HashSet::from([ENGINE_BEHAVIOR_BASE.to_string()]),
            script_bases: HashSet::from([FRAMEWORK_SCRIPT_BASE.to_string()]),
            ancestry: HashMap::new(),
        }
    }

    /// Add an engine component base name.
    #[must_use]
    pub fn with_component_base(mut self, name: impl Into<String>) -> Self {
        self.component_bases.insert(name.into());
        self
    }

    /// Add a framework script base name.
    #[must_use]
    pub fn with_script_base(mut self, name: impl Into<String>) -> Self {
        self.script_bases.insert(name.into());
        self
    }

    /// Record that `child` extends `parent` in the host's type hierarchy.
    #[must_use]
    pub fn with_ancestor(mut self, child: impl Into<String>, parent: impl Into<String>) -> Self {
        self.ancestry.insert(child.into(), parent.into());
        self
    }

    /// Remove every framework script base, simulating a host without the
    /// mod framework installed.
    #[must_use]
    pub fn without_framework(mut self) -> Self {
        self.script_bases.clear();
        self
    }

    /// Walk one base name up the ancestry table, testing membership in
    /// `targets` at every step. Cycle-guarded.
    fn chain_reaches(&self, base: &str, targets: &HashSet<String>) -> bool {
        let mut current = base;
        let mut seen = HashSet::new();
        loop {
            if targets.contains(current) {
                return true;
            }
            if !seen.insert(current) {
                return false;
            }
            match self.ancestry.get(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn any_base_reaches(&self, ty: &TypeInfo, targets: &HashSet<String>) -> bool {
        ty.bases.iter().any(|b| self.chain_reaches(b, targets))
    }
}

impl TypeCapabilities for NameChainCapabilities {
    fn is_component_type(&self, ty: &TypeInfo) -> bool {
        self.any_base_reaches(ty, &self.component_bases)
    }

    fn is_framework_script_type(&self, ty: &TypeInfo) -> bool {
        self.any_base_reaches(ty, &self.script_bases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty_with_bases(bases: &[&str]) -> TypeInfo {
        let mut info = TypeInfo::new("Sample", 1);
        info.bases = bases.iter().map(|b| b.to_string()).collect();
        info
    }

    #[test]
    fn direct_component_base_is_detected() {
        let caps = NameChainCapabilities::new();
        assert!(caps.is_component_type(&ty_with_bases(&["Behavior"])));
        assert!(!caps.is_component_type(&ty_with_bases(&["Printable"])));
    }

    #[test]
    fn framework_base_is_reached_through_ancestry() {
        // SpellArc extends ModScript in a library we are not linked against.
        let caps = NameChainCapabilities::new().with_ancestor("SpellArc", "ModScript");
        assert!(caps.is_framework_script_type(&ty_with_bases(&["SpellArc"])));
    }

    #[test]
    fn multi_step_chain_is_walked() {
        let caps = NameChainCapabilities::new()
            .with_ancestor("FlameJet", "SpellArc")
            .with_ancestor("SpellArc", "ModScript");
        assert!(caps.is_framework_script_type(&ty_with_bases(&["FlameJet"])));
    }

    #[test]
    fn absent_framework_detects_nothing() {
        let caps = NameChainCapabilities::new()
            .with_ancestor("SpellArc", "ModScript")
            .without_framework();
        assert!(!caps.is_framework_script_type(&ty_with_bases(&["SpellArc"])));
    }

    #[test]
    fn ancestry_cycles_terminate() {
        let caps = NameChainCapabilities::new()
            .with_ancestor("A", "B")
            .with_ancestor("B", "A");
        assert!(!caps.is_framework_script_type(&ty_with_bases(&["A"])));
    }

    #[test]
    fn has_operation_reads_metadata() {
        let caps = NameChainCapabilities::new();
        let mut info = TypeInfo::new("Sample", 1);
        info.operations
            .push(spellforge_compile::OperationInfo::new("run", true, 0));

        assert!(caps.has_operation(&info, "run"));
        assert!(!caps.has_operation(&info, "start"));
    }
}
