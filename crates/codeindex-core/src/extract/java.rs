//! Java extractor
//!
//! Node → kind table (`spec.md` §4.3): class/interface/enum declaration →
//! class/interface/type; method_declaration/constructor_declaration →
//! method (a constructor keeps the class's short name); field_declaration →
//! field, or constant when the field lives inside an interface body.
//! Package declaration forms the outermost scope, scope separator `.`.
//! Exported iff the declaration carries a `public` modifier — interface
//! members are always exported regardless of an explicit modifier.

use std::collections::HashSet;
use tree_sitter::Node;

use super::{first_child_of_kind, node_text, rightmost_identifier, signature_of, MAX_AST_DEPTH};
use crate::types::{ExtractedCall, ExtractedReference, ExtractedSymbol, ExtractionRecord, ReferenceKind, Span, SymbolKind};

fn has_public_modifier(node: Node) -> bool {
    let Some(modifiers) = first_child_of_kind(node, &["modifiers"]) else { return false };
    let mut cursor = modifiers.walk();
    modifiers.children(&mut cursor).any(|c| c.kind() == "public")
}

pub(super) fn extract(source: &str, root: Node) -> ExtractionRecord {
    let mut out = ExtractionRecord::default();
    let mut scope: Vec<String> = Vec::new();

    if let Some(pkg) = first_child_of_kind(root, &["package_declaration"]) {
        if let Some(name_node) = first_child_of_kind(pkg, &["scoped_identifier", "identifier"]) {
            scope.push(node_text(name_node, source).to_string());
        }
    }

    let mut suppressed: HashSet<usize> = HashSet::new();
    walk(source, root, &mut scope, &mut suppressed, &mut out, "", false, 0);
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
    current_class: &str,
    in_interface: bool,
    depth: usize,
) {
    if depth > MAX_AST_DEPTH {
        return;
    }

    match node.kind() {
        "class_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Class, &name, scope, node, source, has_public_modifier(node));
                scope.push(name.clone());
                recurse_children(source, node, scope, suppressed, out, &name, false, depth);
                scope.pop();
                return;
            }
        }
        "interface_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Interface, &name, scope, node, source, has_public_modifier(node));
                scope.push(name.clone());
                recurse_children(source, node, scope, suppressed, out, &name, true, depth);
                scope.pop();
                return;
            }
        }
        "enum_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Type, &name, scope, node, source, has_public_modifier(node));
                scope.push(name.clone());
                recurse_children(source, node, scope, suppressed, out, &name, false, depth);
                scope.pop();
                return;
            }
        }
        "constructor_declaration" => {
            suppressed.extend(node.child_by_field_name("name").map(|n| n.id()));
            emit_symbol(out, SymbolKind::Method, current_class, scope, node, source, has_public_modifier(node) || in_interface);
        }
        "method_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Method, &name, scope, node, source, has_public_modifier(node) || in_interface);
            }
        }
        "field_declaration" => {
            if let Some(declarator) = first_child_of_kind(node, &["variable_declarator"]) {
                if let Some(name_node) = declarator.child_by_field_name("name") {
                    let name = node_text(name_node, source).to_string();
                    suppressed.insert(name_node.id());
                    let kind = if in_interface { SymbolKind::Constant } else { SymbolKind::Field };
                    emit_symbol(out, kind, &name, scope, node, source, has_public_modifier(node) || in_interface);
                }
            }
        }
        "method_invocation" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let callee = node_text(name_node, source);
                let span = Span::from_ts_node(&node);
                out.calls.push(ExtractedCall { callee_name: callee.to_string(), site_span: span });
                out.references.push(ExtractedReference { target_name: callee.to_string(), kind: ReferenceKind::Call, span });
            }
        }
        "identifier" | "type_identifier" => {
            if !suppressed.contains(&node.id()) {
                emit_identifier_reference(node, source, out);
            }
        }
        _ => {}
    }

    recurse_children(source, node, scope, suppressed, out, current_class, in_interface, depth);
}

#[allow(clippy::too_many_arguments)]
fn recurse_children(
    source: &str,
    node: Node,
    scope: &mut Vec<String>,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
    current_class: &str,
    in_interface: bool,
    depth: usize,
) {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(source, child, scope, suppressed, out, current_class, in_interface, depth + 1);
    }
}

fn emit_identifier_reference(node: Node, source: &str, out: &mut ExtractionRecord) {
    let name = node_text(node, source);
    if name.is_empty() {
        return;
    }
    let is_write = node
        .parent()
        .map(|p| p.kind() == "assignment_expression" && p.child_by_field_name("left").map(|l| l.id()) == Some(node.id()))
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
    use crate::extract::{extract, ExtractOptions};
    use crate::registry::GrammarRegistry;
    use crate::types::LanguageTag;

    fn run(source: &str) -> ExtractionRecord {
        let mut registry = GrammarRegistry::new(&[LanguageTag::Java]).unwrap();
        let tree = registry.parse(source, LanguageTag::Java).unwrap();
        extract(source, &tree, LanguageTag::Java, &ExtractOptions::default())
    }

    #[test]
    fn package_scope_public_class_and_method() {
        let source = "package com.example;\npublic class Foo {\n    public void bar() { baz(); }\n    private int x;\n}\n";
        let record = run(source);

        let foo = record.symbols.iter().find(|s| s.qualified_name == "com.example.Foo").unwrap();
        assert_eq!(foo.kind, SymbolKind::Class);
        assert!(foo.exported);

        let bar = record.symbols.iter().find(|s| s.qualified_name == "com.example.Foo.bar").unwrap();
        assert_eq!(bar.kind, SymbolKind::Method);
        assert!(bar.exported);

        let x = record.symbols.iter().find(|s| s.qualified_name == "com.example.Foo.x").unwrap();
        assert_eq!(x.kind, SymbolKind::Field);
        assert!(!x.exported);
    }

    #[test]
    fn interface_members_always_exported() {
        let source = "interface Greeter {\n    String NAME = \"x\";\n    void greet();\n}\n";
        let record = run(source);
        let name_const = record.symbols.iter().find(|s| s.name == "NAME").unwrap();
        assert_eq!(name_const.kind, SymbolKind::Constant);
        assert!(name_const.exported);
        let greet = record.symbols.iter().find(|s| s.name == "greet").unwrap();
        assert!(greet.exported);
    }
}
