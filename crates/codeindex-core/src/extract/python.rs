//! Python extractor
//!
//! Node → kind table (`spec.md` §4.3): function/class definitions →
//! function/class; methods inside a class body → method, except a
//! `@property`-decorated method which is classified as property; class-level
//! assignments → property; module-level assignments → variable or constant.
//! Scope separator: `.`. Exported iff the short name does not start with `_`
//! (dunder names like `__init__` are kept, not hidden).

use std::collections::HashSet;
use tree_sitter::Node;

use super::{node_text, rightmost_identifier, signature_of, MAX_AST_DEPTH};
use crate::types::{ExtractedCall, ExtractedReference, ExtractedSymbol, ExtractionRecord, ReferenceKind, Span, SymbolKind};

fn is_exported(name: &str) -> bool {
    !name.starts_with('_') || name.starts_with("__") && name.ends_with("__")
}

fn is_constant_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_uppercase() || c == '_' || c.is_ascii_digit())
}

pub(super) fn extract(source: &str, root: Node) -> ExtractionRecord {
    let mut out = ExtractionRecord::default();
    let mut scope: Vec<String> = Vec::new();
    let mut suppressed: HashSet<usize> = HashSet::new();
    walk(source, root, &mut scope, &mut suppressed, &mut out, false, 0);
    out
}

fn qualify(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope.join("."), name)
    }
}

fn emit_symbol(out: &mut ExtractionRecord, kind: SymbolKind, name: &str, scope: &[String], node: Node, source: &str) {
    out.symbols.push(ExtractedSymbol {
        kind,
        name: name.to_string(),
        qualified_name: qualify(scope, name),
        span: Span::from_ts_node(&node),
        signature: signature_of(node, source),
        exported: is_exported(name),
    });
}

fn walk(
    source: &str,
    node: Node,
    scope: &mut Vec<String>,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
    in_class: bool,
    depth: usize,
) {
    if depth > MAX_AST_DEPTH {
        return;
    }

    match node.kind() {
        "function_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                let kind = if in_class { SymbolKind::Method } else { SymbolKind::Function };
                emit_symbol(out, kind, &name, scope, node, source);
                scope.push(name);
                recurse_children(source, node, scope, suppressed, out, false, depth);
                scope.pop();
                return;
            }
        }
        "class_definition" => {
            if let Some(name_node) = node.child_by_field_name("name") {
                let name = node_text(name_node, source).to_string();
                suppressed.insert(name_node.id());
                emit_symbol(out, SymbolKind::Class, &name, scope, node, source);
                scope.push(name);
                recurse_children(source, node, scope, suppressed, out, true, depth);
                scope.pop();
                return;
            }
        }
        "decorated_definition" => {
            let decorator_names: Vec<String> = node
                .named_children(&mut node.walk())
                .filter(|c| c.kind() == "decorator")
                .filter_map(|d| d.named_child(0).map(|expr| node_text(expr, source).to_string()))
                .collect();
            let is_property = in_class && decorator_names.iter().any(|d| d == "property");

            if is_property {
                let inner = node.named_children(&mut node.walk()).find(|c| c.kind() == "function_definition");
                if let Some(def) = inner {
                    if let Some(name_node) = def.child_by_field_name("name") {
                        let name = node_text(name_node, source).to_string();
                        suppressed.insert(name_node.id());
                        emit_symbol(out, SymbolKind::Property, &name, scope, def, source);
                        scope.push(name);
                        recurse_children(source, def, scope, suppressed, out, false, depth + 1);
                        scope.pop();
                        return;
                    }
                }
            }
        }
        "assignment" if in_class => {
            if let Some(name_node) = node.child_by_field_name("left") {
                if name_node.kind() == "identifier" {
                    let name = node_text(name_node, source).to_string();
                    suppressed.insert(name_node.id());
                    emit_symbol(out, SymbolKind::Property, &name, scope, node, source);
                }
            }
        }
        "assignment" if !in_class && scope.is_empty() => {
            if let Some(name_node) = node.child_by_field_name("left") {
                if name_node.kind() == "identifier" {
                    let name = node_text(name_node, source).to_string();
                    suppressed.insert(name_node.id());
                    let kind = if is_constant_name(&name) { SymbolKind::Constant } else { SymbolKind::Variable };
                    emit_symbol(out, kind, &name, scope, node, source);
                }
            }
        }
        "call" => {
            if let Some(func_node) = node.child_by_field_name("function") {
                if let Some(callee) = rightmost_identifier(func_node, source) {
                    let span = Span::from_ts_node(&node);
                    out.calls.push(ExtractedCall { callee_name: callee.to_string(), site_span: span });
                    out.references.push(ExtractedReference { target_name: callee.to_string(), kind: ReferenceKind::Call, span });
                }
            }
        }
        "identifier" => {
            if !suppressed.contains(&node.id()) {
                emit_identifier_reference(node, source, out);
            }
        }
        _ => {}
    }

    recurse_children(source, node, scope, suppressed, out, in_class, depth);
}

fn recurse_children(
    source: &str,
    node: Node,
    scope: &mut Vec<String>,
    suppressed: &mut HashSet<usize>,
    out: &mut ExtractionRecord,
    in_class: bool,
    depth: usize,
) {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(source, child, scope, suppressed, out, in_class, depth + 1);
    }
}

fn emit_identifier_reference(node: Node, source: &str, out: &mut ExtractionRecord) {
    let name = node_text(node, source);
    if name.is_empty() {
        return;
    }
    let is_write = node
        .parent()
        .map(|p| p.kind() == "assignment" && p.child_by_field_name("left").map(|l| l.id()) == Some(node.id()))
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
        let mut registry = GrammarRegistry::new(&[LanguageTag::Python]).unwrap();
        let tree = registry.parse(source, LanguageTag::Python).unwrap();
        extract(source, &tree, LanguageTag::Python, &ExtractOptions::default())
    }

    #[test]
    fn s3_class_with_dunder_and_private() {
        let source = "class A:\n    def __init__(self):\n        self._priv = 1\n    def _priv(self):\n        pass\n";
        let record = run(source);

        let class_a = record.symbols.iter().find(|s| s.name == "A").unwrap();
        assert_eq!(class_a.kind, SymbolKind::Class);
        assert!(class_a.exported);

        let init = record.symbols.iter().find(|s| s.qualified_name == "A.__init__").unwrap();
        assert_eq!(init.kind, SymbolKind::Method);
        assert!(init.exported);

        let priv_method = record.symbols.iter().find(|s| s.qualified_name == "A._priv").unwrap();
        assert_eq!(priv_method.kind, SymbolKind::Method);
        assert!(!priv_method.exported);
    }

    #[test]
    fn module_level_constant_vs_variable() {
        let source = "MAX_SIZE = 10\ncount = 0\n";
        let record = run(source);
        let max_size = record.symbols.iter().find(|s| s.name == "MAX_SIZE").unwrap();
        assert_eq!(max_size.kind, SymbolKind::Constant);
        let count = record.symbols.iter().find(|s| s.name == "count").unwrap();
        assert_eq!(count.kind, SymbolKind::Variable);
    }

    #[test]
    fn call_emits_call_and_reference() {
        let source = "def a():\n    b()\n";
        let record = run(source);
        assert_eq!(record.calls.len(), 1);
        assert_eq!(record.calls[0].callee_name, "b");
    }

    #[test]
    fn property_decorated_method_is_a_property() {
        let source = "class A:\n    @property\n    def value(self):\n        return self._value\n    def compute(self):\n        pass\n";
        let record = run(source);

        let value = record.symbols.iter().find(|s| s.qualified_name == "A.value").unwrap();
        assert_eq!(value.kind, SymbolKind::Property);

        let compute = record.symbols.iter().find(|s| s.qualified_name == "A.compute").unwrap();
        assert_eq!(compute.kind, SymbolKind::Method);
    }
}
