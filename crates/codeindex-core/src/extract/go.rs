//! Go extractor
//!
//! Node → kind table (`spec.md` §4.3): function declaration → function;
//! method declaration → method with receiver type injected
//! (`pkg.Recv.Method`, pointer receivers unwrapped); type spec →
//! struct/interface/type; var/const spec → variable/constant; interface
//! method_elem → method; struct field → field. Package name forms the
//! outermost scope. Exported iff the short name's first character is
//! uppercase (`spec.md` §4.2).

use std::collections::HashSet;
use tree_sitter::Node;

use super::{first_child_of_kind, node_text, rightmost_identifier, signature_of, MAX_AST_DEPTH};
use crate::types::{ExtractedCall, ExtractedReference, ExtractedSymbol, ExtractionRecord, ReferenceKind, Span, SymbolKind};

fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

/// Strip a leading `*` from a Go pointer-type node, returning the inner
/// type identifier's text (`spec.md` §4.3.4).
fn unwrap_pointer_type<'a>(mut node: Node<'a>, source: &'a str) -> &'a str {
    if node.kind() == "pointer_type" {
        if let Some(inner) = node.named_child(0) {
            node = inner;
        }
    }
    node_text(node, source)
}

pub(super) fn extract(source: &str, root: Node, max_nested_struct_depth: u32) -> ExtractionRecord {
    let mut out = ExtractionRecord::default();
    let mut suppressed: HashSet<usize> = HashSet::new();

    let package = first_child_of_kind(root, &["package_identifier"])
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        walk_top(source, child, &package, &mut suppressed, &mut out, max_nested_struct_depth);
    }

    // Second pass: calls and generic reads/writes over the whole tree.
    walk_refs(source, root, &mut suppressed, &mut out, 0);

    out
}

fn emit_symbol(out: &mut ExtractionRecord, kind: SymbolKind, name: &str, qualified_name: String, node: Node, source: &str) {
    out.symbols.push(ExtractedSymbol {
        kind,
        name: name.to_string(),
        qualified_name,
        span: Span::from_ts_node(&node),
        signature: signature_of(node, source),
        exported: is_exported(name),
    });
}

fn walk_top(
    source: &str,
    node: Node,
    package: &str,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
    max_nested_struct_depth: u32,
) {
    match node.kind() {
        "function_declaration" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Function, &name, format!("{package}.{name}"), node, source);
            }
        }
        "method_declaration" => {
            if let (Some(name_node), Some(receiver)) =
                (node.child_by_field_name("name"), node.child_by_field_name("receiver"))
            {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                let recv_type = receiver
                    .named_child(0)
                    .and_then(|decl| decl.child_by_field_name("type"))
                    .map(|t| unwrap_pointer_type(t, source).to_string())
                    .unwrap_or_default();
                emit_symbol(
                    out,
                    SymbolKind::Method,
                    &name,
                    format!("{package}.{recv_type}.{name}"),
                    node,
                    source,
                );
            }
        }
        "type_declaration" => {
            let mut cursor = node.walk();
            for spec in node.named_children(&mut cursor) {
                if spec.kind() != "type_spec" {
                    continue;
                }
                let Some(name_node) = spec.child_by_field_name("name") else { continue };
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                let type_node = spec.child_by_field_name("type");
                let kind = match type_node.map(|t| t.kind()) {
                    Some("struct_type") => SymbolKind::Struct,
                    Some("interface_type") => SymbolKind::Interface,
                    _ => SymbolKind::Type,
                };
                let qualified = format!("{package}.{name}");
                emit_symbol(out, kind, &name, qualified.clone(), spec, source);

                if let Some(type_node) = type_node {
                    match type_node.kind() {
                        "struct_type" => {
                            walk_struct_fields(source, type_node, &qualified, out, 0, max_nested_struct_depth);
                        }
                        "interface_type" => {
                            walk_interface_methods(source, type_node, &qualified, out);
                        }
                        _ => {}
                    }
                }
            }
        }
        "var_declaration" => walk_var_or_const(source, node, package, "var_spec", SymbolKind::Variable, suppressed, out),
        "const_declaration" => walk_var_or_const(source, node, package, "const_spec", SymbolKind::Constant, suppressed, out),
        _ => {}
    }
}

fn walk_var_or_const(
    source: &str,
    node: Node,
    package: &str,
    spec_kind: &str,
    symbol_kind: SymbolKind,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
) {
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if spec.kind() != spec_kind {
            continue;
        }
        if let Some(name_list) = spec.child_by_field_name("name") {
            let names: Vec<Node> = if name_list.kind() == "identifier_list" {
                let mut c = name_list.walk();
                name_list.named_children(&mut c).collect()
            } else {
                vec![name_list]
            };
            for name_node in names {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, symbol_kind, &name, format!("{package}.{name}"), spec, source);
            }
        }
    }
}

fn walk_struct_fields(
    source: &str,
    struct_type: Node,
    scope: &str,
    out: &mut ExtractionRecord,
    depth: u32,
    max_depth: u32,
) {
    if depth > max_depth {
        return;
    }
    let Some(field_list) = first_child_of_kind(struct_type, &["field_declaration_list"]) else { return };
    let mut cursor = field_list.walk();
    for field in field_list.named_children(&mut cursor) {
        if field.kind() != "field_declaration" {
            continue;
        }
        let type_node = field.child_by_field_name("type");
        match field.child_by_field_name("name") {
            Some(name_node) => {
                let names: Vec<Node> = if name_node.kind() == "field_identifier_list" {
                    let mut c = name_node.walk();
                    name_node.named_children(&mut c).collect()
                } else {
                    vec![name_node]
                };
                for n in names {
                    let name = node_text(n, source).to_string();
                    let qualified = format!("{scope}.{name}");
                    emit_symbol(out, SymbolKind::Field, &name, qualified, field, source);
                }
            }
            None => {
                // Embedded (unnamed) field: name is the embedded type's text.
                if let Some(type_node) = type_node {
                    let name = unwrap_pointer_type(type_node, source).to_string();
                    let qualified = format!("{scope}.{name}");
                    emit_symbol(out, SymbolKind::Field, &name, qualified, field, source);
                }
            }
        }

        if let Some(type_node) = type_node {
            if type_node.kind() == "struct_type" {
                let nested_scope = field
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source).to_string())
                    .unwrap_or_else(|| unwrap_pointer_type(type_node, source).to_string());
                walk_struct_fields(source, type_node, &format!("{scope}.{nested_scope}"), out, depth + 1, max_depth);
            }
        }
    }
}

fn walk_interface_methods(source: &str, interface_type: Node, scope: &str, out: &mut ExtractionRecord) {
    let mut cursor = interface_type.walk();
    for child in interface_type.named_children(&mut cursor) {
        if child.kind() != "method_elem" {
            continue;
        }
        if let Some(name_node) = child.child_by_field_name("name") {
            let name = node_text(name_node, source).to_string();
            emit_symbol(out, SymbolKind::Method, &name, format!("{scope}.{name}"), child, source);
        }
    }
}

fn walk_refs(source: &str, node: Node, suppressed: &mut HashSet<usize>, out: &mut ExtractionRecord, depth: usize) {
    if depth > MAX_AST_DEPTH {
        return;
    }

    if node.kind() == "call_expression" {
        if let Some(func_node) = node.child_by_field_name("function") {
            if let Some(callee) = rightmost_identifier(func_node, source) {
                let span = Span::from_ts_node(&node);
                out.calls.push(ExtractedCall { callee_name: callee.to_string(), site_span: span });
                out.references.push(ExtractedReference { target_name: callee.to_string(), kind: ReferenceKind::Call, span });
            }
        }
    } else if matches!(node.kind(), "identifier" | "field_identifier" | "type_identifier" | "package_identifier") {
        if !suppressed.contains(&node.id()) {
            let name = node_text(node, source);
            if !name.is_empty() {
                let is_write = node
                    .parent()
                    .map(|p| {
                        p.kind() == "assignment_statement"
                            && p.child_by_field_name("left").map(|l| l.id()) == Some(node.id())
                    })
                    .unwrap_or(false);
                out.references.push(ExtractedReference {
                    target_name: name.to_string(),
                    kind: if is_write { ReferenceKind::Write } else { ReferenceKind::Read },
                    span: Span::from_ts_node(&node),
                });
            }
        }
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        walk_refs(source, child, suppressed, out, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract, ExtractOptions};
    use crate::registry::GrammarRegistry;
    use crate::types::LanguageTag;

    fn run(source: &str, max_depth: u32) -> ExtractionRecord {
        let mut registry = GrammarRegistry::new(&[LanguageTag::Go]).unwrap();
        let tree = registry.parse(source, LanguageTag::Go).unwrap();
        extract(source, &tree, LanguageTag::Go, &ExtractOptions { max_nested_struct_depth: max_depth })
    }

    #[test]
    fn s2_package_and_method() {
        let source = "package p\ntype Foo struct{ N int }\nfunc (f *Foo) Bar() { Baz() }\nfunc Baz() {}\n";
        let record = run(source, 3);

        let foo = record.symbols.iter().find(|s| s.qualified_name == "p.Foo").unwrap();
        assert_eq!(foo.kind, SymbolKind::Struct);
        assert!(foo.exported);

        let n = record.symbols.iter().find(|s| s.qualified_name == "p.Foo.N").unwrap();
        assert_eq!(n.kind, SymbolKind::Field);
        assert!(n.exported);

        let bar = record.symbols.iter().find(|s| s.qualified_name == "p.Foo.Bar").unwrap();
        assert_eq!(bar.kind, SymbolKind::Method);
        assert!(bar.exported);

        let baz = record.symbols.iter().find(|s| s.qualified_name == "p.Baz").unwrap();
        assert_eq!(baz.kind, SymbolKind::Function);

        let call = record.calls.iter().find(|c| c.callee_name == "Baz").unwrap();
        assert_eq!(call.callee_name, "Baz");
    }

    #[test]
    fn receiver_injection_bare_function() {
        let source = "package p\nfunc Bar() {}\n";
        let record = run(source, 3);
        assert!(record.symbols.iter().any(|s| s.qualified_name == "p.Bar"));
    }

    #[test]
    fn nested_struct_depth_limit() {
        let source = "package p\ntype Outer struct {\n  A struct {\n    B struct {\n      C struct {\n        D int\n      }\n    }\n  }\n}\n";
        let record = run(source, 1);
        assert!(record.symbols.iter().any(|s| s.qualified_name == "p.Outer.A"));
        assert!(record.symbols.iter().any(|s| s.qualified_name == "p.Outer.A.B"));
        assert!(!record.symbols.iter().any(|s| s.qualified_name.contains("C")));
    }
}
