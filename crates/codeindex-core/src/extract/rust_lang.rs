//! Rust extractor
//!
//! Node → kind table (`spec.md` §4.3): function_item → function;
//! struct_item → struct; enum_item/trait_item → interface... no: enum_item →
//! type, trait_item → interface; const_item → constant; static_item →
//! variable; mod_item → module. `impl` block methods qualify under the
//! impl's type; trait methods qualify under the trait. Scope separator
//! `::`, struct fields use `.`. Exported iff the declaration carries a `pub`
//! visibility modifier.

use std::collections::HashSet;
use tree_sitter::Node;

use super::{first_child_of_kind, node_text, rightmost_identifier, signature_of, MAX_AST_DEPTH};
use crate::types::{ExtractedCall, ExtractedReference, ExtractedSymbol, ExtractionRecord, ReferenceKind, Span, SymbolKind};

fn has_pub_modifier(node: Node) -> bool {
    first_child_of_kind(node, &["visibility_modifier"]).is_some()
}

pub(super) fn extract(source: &str, root: Node) -> ExtractionRecord {
    let mut out = ExtractionRecord::default();
    let mut scope: Vec<String> = Vec::new();
    let mut suppressed: HashSet<usize> = HashSet::new();
    walk(source, root, &mut scope, &mut suppressed, &mut out, 0);
    out
}

fn qualify(scope: &[String], sep: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", scope.join(sep), sep, name)
    }
}

fn emit_symbol(
    out: &mut ExtractionRecord,
    kind: SymbolKind,
    name: &str,
    scope: &[String],
    sep: &str,
    node: Node,
    source: &str,
) {
    out.symbols.push(ExtractedSymbol {
        kind,
        name: name.to_string(),
        qualified_name: qualify(scope, sep, name),
        span: Span::from_ts_node(&node),
        signature: signature_of(node, source),
        exported: has_pub_modifier(node),
    });
}

fn walk(
    source: &str,
    node: Node,
    scope: &mut Vec<String>,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
    depth: usize,
) {
    if depth > MAX_AST_DEPTH {
        return;
    }

    match node.kind() {
        "function_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                let kind = if scope.is_empty() { SymbolKind::Function } else { SymbolKind::Method };
                emit_symbol(out, kind, &name, scope, "::", node, source);
            }
        }
        "struct_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Struct, &name, scope, "::", node, source);
                let qualified_scope_name = name.clone();
                walk_struct_fields(source, node, scope, &qualified_scope_name, out);
            }
        }
        "enum_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Type, &name, scope, "::", node, source);
            }
        }
        "trait_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Interface, &name, scope, "::", node, source);
                scope.push(name);
                recurse_children(source, node, scope, suppressed, out, depth);
                scope.pop();
                return;
            }
        }
        "const_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Constant, &name, scope, "::", node, source);
            }
        }
        "static_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Variable, &name, scope, "::", node, source);
            }
        }
        "mod_item" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Module, &name, scope, "::", node, source);
                scope.push(name);
                recurse_children(source, node, scope, suppressed, out, depth);
                scope.pop();
                return;
            }
        }
        "impl_item" => {
            let type_name = node
                .child_by_field_name("type")
                .and_then(|t| rightmost_identifier(t, source))
                .unwrap_or("")
                .to_string();
            scope.push(type_name);
            recurse_children(source, node, scope, suppressed, out, depth);
            scope.pop();
            return;
        }
        "call_expression" => {
            if let Some(func_node) = node.child_by_field_name("function") {
                if let Some(callee) = rightmost_identifier(func_node, source) {
                    let span = Span::from_ts_node(&node);
                    out.calls.push(ExtractedCall { callee_name: callee.to_string(), site_span: span });
                    out.references.push(ExtractedReference { target_name: callee.to_string(), kind: ReferenceKind::Call, span });
                }
            }
        }
        "identifier" | "field_identifier" | "type_identifier" => {
            if !suppressed.contains(&node.id()) {
                emit_identifier_reference(node, source, out);
            }
        }
        _ => {}
    }

    recurse_children(source, node, scope, suppressed, out, depth);
}

fn walk_struct_fields(source: &str, struct_item: Node, scope: &[String], type_name: &str, out: &mut ExtractionRecord) {
    let Some(field_list) = first_child_of_kind(struct_item, &["field_declaration_list"]) else { return };
    let mut cursor = field_list.walk();
    for field in field_list.named_children(&mut cursor) {
        if field.kind() != "field_declaration" {
            continue;
        }
        if let Some(name_node) = field.child_by_field_name("name") {
            let name = node_text(name_node, source).to_string();
            out.symbols.push(ExtractedSymbol {
                kind: SymbolKind::Field,
                name: name.clone(),
                qualified_name: format!("{}.{}", qualify(scope, "::", type_name), name),
                span: Span::from_ts_node(&field),
                signature: signature_of(field, source),
                exported: has_pub_modifier(field),
            });
        }
    }
}

fn recurse_children(
    source: &str,
    node: Node,
    scope: &mut Vec<String>,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
    depth: usize,
) {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(source, child, scope, suppressed, out, depth + 1);
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
        let mut registry = GrammarRegistry::new(&[LanguageTag::Rust]).unwrap();
        let tree = registry.parse(source, LanguageTag::Rust).unwrap();
        extract(source, &tree, LanguageTag::Rust, &ExtractOptions::default())
    }

    #[test]
    fn pub_struct_with_impl_method() {
        let source = "pub struct Foo { pub n: i32 }\nimpl Foo {\n    pub fn bar(&self) { baz(); }\n}\nfn baz() {}\n";
        let record = run(source);

        let foo = record.symbols.iter().find(|s| s.name == "Foo" && s.kind == SymbolKind::Struct).unwrap();
        assert!(foo.exported);

        let n = record.symbols.iter().find(|s| s.qualified_name == "Foo.n").unwrap();
        assert!(n.exported);

        let bar = record.symbols.iter().find(|s| s.qualified_name == "Foo::bar").unwrap();
        assert_eq!(bar.kind, SymbolKind::Method);
        assert!(bar.exported);

        let baz = record.symbols.iter().find(|s| s.qualified_name == "baz").unwrap();
        assert_eq!(baz.kind, SymbolKind::Function);

        assert!(record.calls.iter().any(|c| c.callee_name == "baz"));
    }

    #[test]
    fn private_function_not_exported() {
        let source = "fn helper() {}\n";
        let record = run(source);
        let helper = record.symbols.iter().find(|s| s.name == "helper").unwrap();
        assert!(!helper.exported);
    }
}
