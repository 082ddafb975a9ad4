//! Source compiler front end
//!
//! Compiles mod-script source text into a [`CompiledUnit`]:
//! 1. Parse with tree-sitter; every ERROR/MISSING node becomes a per-line
//!    diagnostic.
//! 2. Resolve top-level imports against the [`ReferenceSet`]; unknown
//!    roots become diagnostics.
//! 3. Extract the public top-level types with their capability markers
//!    (implemented trait names), operations, and public fields.
//!
//! Malformed source never panics the host; only an unusable toolchain is
//! surfaced as the fatal [`CompileError::Toolchain`] class.

use crate::diagnostics::{CompileError, Diagnostic};
use crate::reference::ReferenceSet;
use crate::types::{CompiledUnit, OperationInfo, TypeInfo};
use indexmap::IndexMap;
use tree_sitter::{Node, Parser};

/// Import roots resolved by the language itself rather than a reference.
const INTRINSIC_ROOTS: &[&str] = &["crate", "self", "super", "std", "core", "alloc"];

/// Compiles source text into in-memory units.
///
/// Stateless; a fresh parser is built per call so concurrent compiles
/// never share mutable parser state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceCompiler;

impl SourceCompiler {
    /// Create a compiler.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compile `source` against `references`.
    ///
    /// # Errors
    /// - [`CompileError::Source`] with per-line diagnostics for malformed
    ///   source or unresolved imports
    /// - [`CompileError::Toolchain`] if the grammar cannot be loaded
    pub fn compile(
        &self,
        source: &str,
        references: &ReferenceSet,
    ) -> Result<CompiledUnit, CompileError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .map_err(|e| CompileError::Toolchain(format!("script grammar unavailable: {e}")))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| CompileError::Toolchain("parser produced no syntax tree".to_string()))?;

        let src = source.as_bytes();
        let root = tree.root_node();

        let mut diagnostics = collect_syntax_errors(root, src);
        diagnostics.extend(check_imports(root, src, references));
        diagnostics.sort_by_key(|d| d.line);

        if !diagnostics.is_empty() {
            for diag in &diagnostics {
                tracing::debug!(line = diag.line, message = %diag.message, "compile diagnostic");
            }
            return Err(CompileError::Source { diagnostics });
        }

        let types = extract_types(root, src);
        tracing::debug!(types = types.len(), "compiled unit");

        Ok(CompiledUnit {
            types,
            diagnostics: Vec::new(),
        })
    }
}

/// Extract a text slice for a node.
fn node_text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

/// Text of a direct child selected by field name.
fn field_text<'a>(node: Node<'_>, field: &str, src: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| node_text(n, src))
}

/// Short single-line excerpt for error messages.
fn excerpt(node: Node<'_>, src: &[u8]) -> String {
    let text = node_text(node, src).trim();
    let line = text.lines().next().unwrap_or("");
    if line.is_empty() {
        return "<end of input>".to_string();
    }
    let mut out: String = line.chars().take(32).collect();
    if line.chars().count() > 32 {
        out.push('…');
    }
    out
}

/// Walk subtrees that contain errors, collecting one diagnostic per
/// ERROR/MISSING node. Children of an ERROR node are not descended into,
/// so one malformed region reports once.
fn collect_syntax_errors(root: Node<'_>, src: &[u8]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.is_error() {
            let line = node.start_position().row + 1;
            out.push(Diagnostic::new(line, format!("syntax error near `{}`", excerpt(node, src))));
            continue;
        }
        if node.is_missing() {
            let line = node.start_position().row + 1;
            out.push(Diagnostic::new(line, format!("missing `{}`", node.kind())));
            continue;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    out
}

/// Resolve each top-level import root against the reference set.
fn check_imports(root: Node<'_>, src: &[u8], references: &ReferenceSet) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut cursor = root.walk();

    for node in root.children(&mut cursor) {
        if node.kind() != "use_declaration" {
            continue;
        }
        let Some(argument) = node.child_by_field_name("argument") else {
            continue;
        };
        let Some(import_root) = import_root(node_text(argument, src)) else {
            continue;
        };
        if INTRINSIC_ROOTS.contains(&import_root.as_str()) {
            continue;
        }
        if !references.contains_base(&import_root) {
            out.push(Diagnostic::new(
                node.start_position().row + 1,
                format!("unresolved import `{import_root}`: no matching reference"),
            ));
        }
    }

    out
}

/// Root identifier of an import path, if it has a simple one.
fn import_root(argument: &str) -> Option<String> {
    let first = argument.trim_start_matches("::").split("::").next()?;
    let ident: String = first
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!ident.is_empty()).then_some(ident)
}

/// Whether an item carries a `pub` visibility modifier.
fn is_public(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let has_vis = node
        .children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier");
    has_vis
}

/// Simple type name from an impl target or trait node: last path segment,
/// generics stripped.
fn simple_type_name(text: &str) -> String {
    let no_generics = text.split('<').next().unwrap_or(text);
    no_generics
        .rsplit("::")
        .next()
        .unwrap_or(no_generics)
        .trim()
        .to_string()
}

/// Collect public field names from a struct body.
fn collect_fields(body: Node<'_>, src: &[u8]) -> Vec<String> {
    let mut fields = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() == "field_declaration" && is_public(child) {
            if let Some(name) = field_text(child, "name", src) {
                fields.push(name.to_string());
            }
        }
    }
    fields
}

/// Collect operations from an impl body. Trait-impl methods are public by
/// way of the trait; inherent methods need their own `pub`.
fn collect_operations(body: Node<'_>, src: &[u8], trait_impl: bool) -> Vec<OperationInfo> {
    let mut ops = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() != "function_item" {
            continue;
        }
        let Some(name) = field_text(child, "name", src) else {
            continue;
        };
        let arity = child
            .child_by_field_name("parameters")
            .map(|params| {
                let mut pc = params.walk();
                params
                    .children(&mut pc)
                    .filter(|p| p.kind() == "parameter")
                    .count()
            })
            .unwrap_or(0);
        ops.push(OperationInfo::new(
            name,
            trait_impl || is_public(child),
            arity,
        ));
    }
    ops
}

/// Build the type map: public top-level structs/enums first, then impl
/// blocks contribute trait markers and operations.
fn extract_types(root: Node<'_>, src: &[u8]) -> IndexMap<String, TypeInfo> {
    let mut types: IndexMap<String, TypeInfo> = IndexMap::new();

    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        match node.kind() {
            "struct_item" | "enum_item" => {
                if !is_public(node) {
                    continue;
                }
                let Some(name) = field_text(node, "name", src) else {
                    continue;
                };
                let mut info = TypeInfo::new(name, node.start_position().row + 1);
                if node.kind() == "struct_item" {
                    if let Some(body) = node.child_by_field_name("body") {
                        info.properties = collect_fields(body, src);
                    }
                }
                types.insert(name.to_string(), info);
            }
            _ => {}
        }
    }

    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        if node.kind() != "impl_item" {
            continue;
        }
        let Some(target) = field_text(node, "type", src) else {
            continue;
        };
        let target = simple_type_name(target);
        let Some(info) = types.get_mut(&target) else {
            // Impl for a type this unit does not declare; nothing to record.
            continue;
        };

        let trait_name = node
            .child_by_field_name("trait")
            .map(|t| simple_type_name(node_text(t, src)));
        if let Some(trait_name) = &trait_name {
            if !info.bases.contains(trait_name) {
                info.bases.push(trait_name.clone());
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            for op in collect_operations(body, src, trait_name.is_some()) {
                if info.operation(&op.name).is_none() {
                    info.operations.push(op);
                }
            }
        }
    }

    types
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(names: &[&str]) -> ReferenceSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    const FIREBALL: &str = r#"
use engine::prelude::*;

pub struct FireballSpell {
    pub damage: f32,
    speed: f32,
}

impl Behavior for FireballSpell {
    fn on_enable(&mut self) {}
    fn update(&mut self) {}
}

impl FireballSpell {
    pub fn damage(&self) -> f32 {
        self.damage
    }

    fn internal(&self) {}
}
"#;

    #[test]
    fn compile_extracts_public_types_exactly() {
        let unit = SourceCompiler::new()
            .compile(FIREBALL, &refs(&["engine"]))
            .unwrap();

        assert_eq!(unit.type_names(), vec!["FireballSpell"]);
        assert!(unit.diagnostics.is_empty());
    }

    #[test]
    fn compile_records_bases_operations_and_fields() {
        let unit = SourceCompiler::new()
            .compile(FIREBALL, &refs(&["engine"]))
            .unwrap();

        let info = unit.get("FireballSpell").unwrap();
        assert_eq!(info.bases, vec!["Behavior"]);
        assert!(info.operation("on_enable").unwrap().public);
        assert!(info.operation("update").is_some());
        assert!(info.operation("damage").unwrap().public);
        assert!(!info.operation("internal").unwrap().public);
        assert_eq!(info.properties, vec!["damage"]);
    }

    #[test]
    fn compile_skips_private_types() {
        let source = "struct Hidden; pub struct Visible;";
        let unit = SourceCompiler::new().compile(source, &refs(&[])).unwrap();

        assert_eq!(unit.type_names(), vec!["Visible"]);
    }

    #[test]
    fn compile_extracts_enums() {
        let source = "pub enum SpellKind { Fire, Ice }";
        let unit = SourceCompiler::new().compile(source, &refs(&[])).unwrap();

        assert!(unit.get("SpellKind").is_some());
    }

    #[test]
    fn malformed_source_yields_line_diagnostics() {
        let source = "pub struct Broken {\n    field f32\n}";
        let err = SourceCompiler::new()
            .compile(source, &refs(&[]))
            .unwrap_err();

        let diags = err.diagnostics();
        assert!(!diags.is_empty());
        assert!(diags.iter().all(|d| d.line >= 1));
        assert!(!err.is_toolchain());
    }

    #[test]
    fn unresolved_import_is_a_diagnostic() {
        let source = "use engine::prelude::*;\npub struct S;";
        let err = SourceCompiler::new()
            .compile(source, &refs(&[]))
            .unwrap_err();

        assert!(err.diagnostics()[0].message.contains("unresolved import `engine`"));
        assert_eq!(err.diagnostics()[0].line, 1);
    }

    #[test]
    fn intrinsic_imports_need_no_reference() {
        let source = "use std::collections::HashMap;\nuse crate::helpers;\npub struct S;";
        assert!(SourceCompiler::new().compile(source, &refs(&[])).is_ok());
    }

    #[test]
    fn reference_base_matching_ignores_path_and_case() {
        let source = "use engine::prelude::*;\npub struct S;";
        let set = refs(&["/game/libs/Engine.rlib"]);
        assert!(SourceCompiler::new().compile(source, &set).is_ok());
    }

    #[test]
    fn compile_is_deterministic() {
        let compiler = SourceCompiler::new();
        let source = "pub struct Broken {";
        let set = refs(&[]);

        let first = compiler.compile(source, &set).unwrap_err();
        let second = compiler.compile(source, &set).unwrap_err();
        assert_eq!(first.diagnostics(), second.diagnostics());
    }

    #[test]
    fn compile_has_no_filesystem_side_effects() {
        // Pure function of its inputs: nothing to flush, nothing to clean up.
        let unit = SourceCompiler::new()
            .compile("pub struct S;", &refs(&[]))
            .unwrap();
        assert_eq!(unit.len(), 1);
    }
}
