//! TypeScript/JavaScript extractor
//!
//! Node → kind table (`spec.md` §4.3): function/arrow-in-declarator →
//! function; class → class; interface → interface (TS only); type alias →
//! type (TS only); method_definition → method; field_definition →
//! property. Scope separator: `.`.

use std::collections::HashSet;
use tree_sitter::Node;

use super::{has_export_parent, node_text, rightmost_identifier, signature_of, MAX_AST_DEPTH};
use crate::types::{ExtractedCall, ExtractedReference, ExtractedSymbol, ExtractionRecord, ReferenceKind, Span, SymbolKind};

/// `is_typescript` toggles interface/type-alias extraction, which the
/// JavaScript grammar has no node kinds for.
pub(super) fn extract(source: &str, root: Node, is_typescript: bool) -> ExtractionRecord {
    let mut out = ExtractionRecord::default();
    let mut scope: Vec<String> = Vec::new();
    let mut suppressed: HashSet<usize> = HashSet::new();
    walk(source, root, &mut scope, &mut suppressed, &mut out, is_typescript, 0);
    out
}

fn qualify(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope.join("."), name)
    }
}

fn emit_symbol(
    out: &mut ExtractionRecord,
    kind: SymbolKind,
    name: &str,
    scope: &[String],
    node: Node,
    source: &str,
    exported: bool,
) {
    out.symbols.push(ExtractedSymbol {
        kind,
        name: name.to_string(),
        qualified_name: qualify(scope, name),
        span: Span::from_ts_node(&node),
        signature: signature_of(node, source),
        exported,
    });
}

#[allow(clippy::too_many_arguments)]
fn walk(
    source: &str,
    node: Node,
    scope: &mut Vec<String>,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
    is_typescript: bool,
    depth: usize,
) {
    if depth > MAX_AST_DEPTH {
        return;
    }

    let kind = node.kind();

    match kind {
        "function_declaration" | "function" | "generator_function_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source);
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Function, name, scope, node, source, has_export_parent(node));
            }
        }
        "class_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Class, &name, scope, node, source, has_export_parent(node));
                scope.push(name);
                recurse_children(source, node, scope, suppressed, out, is_typescript, depth);
                scope.pop();
                return;
            }
        }
        "interface_declaration" if is_typescript => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Interface, &name, scope, node, source, has_export_parent(node));
                scope.push(name);
                recurse_children(source, node, scope, suppressed, out, is_typescript, depth);
                scope.pop();
                return;
            }
        }
        "type_alias_declaration" if is_typescript => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source);
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Type, name, scope, node, source, has_export_parent(node));
            }
        }
        "method_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source);
                suppressed.insert(name_node.id());
                // Methods are exported with their containing class, not
                // individually wrapped in export_*; per spec.md S1 only a
                // node's own direct export wrapper counts, so nested
                // methods are never exported on their own.
                emit_symbol(out, SymbolKind::Method, name, scope, node, source, false);
            }
        }
        "field_definition" | "public_field_definition" => {
            if let Some(name_node) = node.child_by_field_name("property") {
                let name = node_text(name_node, source);
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Property, name, scope, node, source, false);
            }
        }
        "variable_declarator" => {
            if let (Some(name_node), Some(value_node)) =
                (node.child_by_field_name("name"), node.child_by_field_name("value"))
            {
                if matches!(value_node.kind(), "arrow_function" | "function" | "function_expression")
                    && name_node.kind() == "identifier"
                {
                    let name = node_text(name_node, source);
                    suppressed.insert(name_node.id());
                    // Exported flag depends on the enclosing lexical_declaration.
                    let exported = node
                        .parent()
                        .map(has_export_parent)
                        .unwrap_or(false);
                    emit_symbol(out, SymbolKind::Function, name, scope, node, source, exported);
                }
            }
        }
        "call_expression" => {
            if let Some(func_node) = node.child_by_field_name("function") {
                if let Some(callee) = rightmost_identifier(func_node, source) {
                    let span = Span::from_ts_node(&node);
                    out.calls.push(ExtractedCall { callee_name: callee.to_string(), site_span: span });
                    out.references.push(ExtractedReference {
                        target_name: callee.to_string(),
                        kind: ReferenceKind::Call,
                        span,
                    });
                }
            }
        }
        "identifier" | "property_identifier" | "type_identifier" => {
            if !suppressed.contains(&node.id()) {
                emit_identifier_reference(node, source, out);
            }
        }
        _ => {}
    }

    recurse_children(source, node, scope, suppressed, out, is_typescript, depth);
}

#[allow(clippy::too_many_arguments)]
fn recurse_children(
    source: &str,
    node: Node,
    scope: &mut Vec<String>,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
    is_typescript: bool,
    depth: usize,
) {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(source, child, scope, suppressed, out, is_typescript, depth + 1);
    }
}

fn emit_identifier_reference(node: Node, source: &str, out: &mut ExtractionRecord) {
    let name = node_text(node, source);
    if name.is_empty() {
        return;
    }
    let parent = node.parent();
    let is_write = parent
        .map(|p| {
            p.kind() == "assignment_expression"
                && p.child_by_field_name("left").map(|l| l.id()) == Some(node.id())
        })
        .unwrap_or(false);
    out.references.push(ExtractedReference {
        target_name: name.to_string(),
        kind: if is_write { ReferenceKind::Write } else { ReferenceKind::Read },
        span: Span::from_ts_node(&node),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::GrammarRegistry;
    use crate::types::LanguageTag;

    fn run(source: &str, tag: LanguageTag) -> ExtractionRecord {
        let mut registry = GrammarRegistry::new(&[tag]).unwrap();
        let tree = registry.parse(source, tag).unwrap();
        super::super::extract(source, &tree, tag, &super::super::ExtractOptions::default())
    }

    #[test]
    fn s1_ts_class() {
        let source = "export class Calculator { add(v:number){return v;} private x=0; }";
        let record = run(source, LanguageTag::Typescript);

        let calc = record.symbols.iter().find(|s| s.name == "Calculator").unwrap();
        assert_eq!(calc.kind, SymbolKind::Class);
        assert!(calc.exported);
        assert_eq!(calc.qualified_name, "Calculator");

        let add = record.symbols.iter().find(|s| s.name == "add").unwrap();
        assert_eq!(add.kind, SymbolKind::Method);
        assert!(!add.exported);
        assert_eq!(add.qualified_name, "Calculator.add");

        let x = record.symbols.iter().find(|s| s.name == "x").unwrap();
        assert_eq!(x.kind, SymbolKind::Property);
        assert!(!x.exported);
        assert_eq!(x.qualified_name, "Calculator.x");
    }

    #[test]
    fn definition_identifier_is_not_also_a_reference() {
        let source = "function add(a, b) { return a + b; }";
        let record = run(source, LanguageTag::Javascript);
        assert_eq!(record.symbols.len(), 1);
        assert!(!record.references.iter().any(|r| r.target_name == "add"));
    }

    #[test]
    fn call_emits_call_and_reference() {
        let source = "function a() { b(); }";
        let record = run(source, LanguageTag::Javascript);
        assert_eq!(record.calls.len(), 1);
        assert_eq!(record.calls[0].callee_name, "b");
        assert!(record.references.iter().any(|r| r.kind == ReferenceKind::Call && r.target_name == "b"));
    }
}
