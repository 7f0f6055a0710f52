//! HTML extractor
//!
//! Node → kind table (`spec.md` §4.3): an element with an `id` attribute →
//! variable qualified as `#id`; each whitespace-delimited token of a
//! `class` attribute → variable qualified as `.class`; a non-standard tag
//! name (not in the fixed HTML5 whitelist) → class; `script`/`style`
//! elements → module. All HTML-extracted symbols are exported.

use tree_sitter::Node;

use super::{node_text, MAX_AST_DEPTH};
use crate::types::{ExtractedSymbol, ExtractionRecord, Span, SymbolKind};

const HTML5_TAGS: &[&str] = &[
    "html", "head", "body", "title", "meta", "link", "base", "style", "script", "noscript",
    "div", "span", "p", "a", "img", "ul", "ol", "li", "table", "thead", "tbody", "tfoot", "tr",
    "td", "th", "form", "input", "button", "label", "select", "option", "textarea", "header",
    "footer", "nav", "main", "section", "article", "aside", "figure", "figcaption", "h1", "h2",
    "h3", "h4", "h5", "h6", "br", "hr", "b", "i", "u", "strong", "em", "small", "code", "pre",
    "blockquote", "iframe", "video", "audio", "source", "canvas", "svg", "path", "template",
];

fn tag_name(element: Node, source: &str) -> Option<String> {
    let start_tag = element
        .named_child(0)
        .filter(|n| matches!(n.kind(), "start_tag" | "self_closing_tag"))?;
    let mut cursor = start_tag.walk();
    start_tag
        .named_children(&mut cursor)
        .find(|c| c.kind() == "tag_name")
        .map(|n| node_text(n, source).to_lowercase())
}

fn attribute_value<'a>(element: Node<'a>, source: &'a str, attr_name: &str) -> Option<String> {
    let start_tag = element
        .named_child(0)
        .filter(|n| matches!(n.kind(), "start_tag" | "self_closing_tag"))?;
    let mut cursor = start_tag.walk();
    for attr in start_tag.named_children(&mut cursor) {
        if attr.kind() != "attribute" {
            continue;
        }
        let mut attr_cursor = attr.walk();
        let children: Vec<Node> = attr.named_children(&mut attr_cursor).collect();
        let Some(name_node) = children.first() else { continue };
        if node_text(*name_node, source) != attr_name {
            continue;
        }
        if let Some(value_node) = children.get(1) {
            let raw = node_text(*value_node, source);
            return Some(raw.trim_matches(|c| c == '"' || c == '\'').to_string());
        }
    }
    None
}

pub(super) fn extract(source: &str, root: Node) -> ExtractionRecord {
    let mut out = ExtractionRecord::default();
    walk(source, root, &mut out, 0);
    out
}

fn emit(out: &mut ExtractionRecord, kind: SymbolKind, name: &str, qualified_name: String, node: Node) {
    out.symbols.push(ExtractedSymbol {
        kind,
        name: name.to_string(),
        qualified_name,
        span: Span::from_ts_node(&node),
        signature: None,
        exported: true,
    });
}

fn walk(source: &str, node: Node, out: &mut ExtractionRecord, depth: usize) {
    if depth > MAX_AST_DEPTH {
        return;
    }

    if node.kind() == "element" {
        if let Some(tag) = tag_name(node, source) {
            match tag.as_str() {
                "script" | "style" => {
                    emit(out, SymbolKind::Module, &tag, tag.clone(), node);
                }
                other if !HTML5_TAGS.contains(&other) => {
                    emit(out, SymbolKind::Class, other, other.to_string(), node);
                }
                _ => {}
            }
        }

        if let Some(id) = attribute_value(node, source, "id") {
            if !id.is_empty() {
                emit(out, SymbolKind::Variable, &id, format!("#{id}"), node);
            }
        }

        if let Some(class_attr) = attribute_value(node, source, "class") {
            for token in class_attr.split_whitespace() {
                emit(out, SymbolKind::Variable, token, format!(".{token}"), node);
            }
        }
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children {
        walk(source, child, out, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract, ExtractOptions};
    use crate::registry::GrammarRegistry;
    use crate::types::LanguageTag;

    fn run(source: &str) -> ExtractionRecord {
        let mut registry = GrammarRegistry::new(&[LanguageTag::Html]).unwrap();
        let tree = registry.parse(source, LanguageTag::Html).unwrap();
        extract(source, &tree, LanguageTag::Html, &ExtractOptions::default())
    }

    #[test]
    fn id_and_class_attributes() {
        let source = "<div id=\"main\" class=\"card highlighted\"></div>";
        let record = run(source);
        assert!(record.symbols.iter().any(|s| s.qualified_name == "#main"));
        assert!(record.symbols.iter().any(|s| s.qualified_name == ".card"));
        assert!(record.symbols.iter().any(|s| s.qualified_name == ".highlighted"));
    }

    #[test]
    fn custom_element_is_class() {
        let source = "<my-widget></my-widget>";
        let record = run(source);
        let widget = record.symbols.iter().find(|s| s.name == "my-widget").unwrap();
        assert_eq!(widget.kind, SymbolKind::Class);
    }

    #[test]
    fn script_is_module() {
        let source = "<script>var x = 1;</script>";
        let record = run(source);
        assert!(record.symbols.iter().any(|s| s.kind == SymbolKind::Module && s.name == "script"));
    }

    #[test]
    fn standard_tag_without_attrs_emits_nothing() {
        let source = "<p>hello</p>";
        let record = run(source);
        assert!(record.symbols.is_empty());
    }
}
