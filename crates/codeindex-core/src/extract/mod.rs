//! Extraction framework — syntax tree to symbol/call/reference records
//!
//! ARCHITECTURE: generalizes `transform::structure`'s tree walk (byte-range
//! bookkeeping, depth-guarded recursion over `tree_sitter::Node`) from
//! *rewriting* source text into *emitting records*. Each language module
//! below is a closed `match` over that language's node-kind strings — a
//! pattern match over a closed enum of tags, not a class hierarchy
//! (`spec.md` §9) — dispatched from [`extract`].
//!
//! Failure semantics: a malformed subtree simply yields no symbol for that
//! subtree; extraction itself never returns `Err` (`spec.md` §4.3,
//! "Extraction never aborts indexing").

mod go;
mod html;
mod java;
mod python;
mod rust_lang;
mod typescript;

use tree_sitter::{Node, Tree};

use crate::types::{ExtractionRecord, LanguageTag};

/// Maximum AST recursion depth, mirrors `MAX_AST_DEPTH` in the teacher's
/// structure transform — guards against stack overflow on pathological
/// (or adversarial) input trees.
pub(crate) const MAX_AST_DEPTH: usize = 500;

/// Knobs that affect extraction and that a caller (the indexer, ultimately
/// `Config`) may configure per `spec.md` §6.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Go only: anonymous struct types nested inside struct fields are
    /// descended up to this depth; fields beyond it are dropped
    /// (`spec.md` §4.3.3).
    pub max_nested_struct_depth: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { max_nested_struct_depth: 3 }
    }
}

/// Extract symbols/calls/references from a parsed tree.
///
/// This is the single entry point the indexer calls per file
/// (`spec.md` §4.2).
pub fn extract(source: &str, tree: &Tree, tag: LanguageTag, options: &ExtractOptions) -> ExtractionRecord {
    let root = tree.root_node();
    match tag {
        LanguageTag::Typescript | LanguageTag::Tsx => {
            typescript::extract(source, root, true)
        }
        LanguageTag::Javascript | LanguageTag::Jsx => {
            typescript::extract(source, root, false)
        }
        LanguageTag::Go => go::extract(source, root, options.max_nested_struct_depth),
        LanguageTag::Python => python::extract(source, root),
        LanguageTag::Rust => rust_lang::extract(source, root),
        LanguageTag::Java => java::extract(source, root),
        LanguageTag::Html => html::extract(source, root),
    }
}

// ============================================================================
// Shared helpers used by every per-language module
// ============================================================================

/// Raw source text spanned by `node`.
pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// `true` if `node`'s immediate parent's node kind begins with `export_` —
/// the TypeScript/JavaScript exported-flag rule (`spec.md` §4.2).
///
/// Only the *direct* parent is checked, not the full ancestor chain: a
/// top-level `class Foo {}` wrapped in `export class Foo {}` has
/// `export_statement` as its direct parent, but `Foo`'s methods and fields
/// (nested under `class_body`) do not inherit that export — each is
/// exported only if *it* carries its own `export_` wrapper, matching the
/// worked example in `spec.md` §8 (S1): a class's members are not exported
/// just because the class is.
pub(crate) fn has_export_parent(node: Node) -> bool {
    node.parent()
        .map(|p| p.kind().starts_with("export_"))
        .unwrap_or(false)
}

/// The rightmost identifier-like leaf under `node`'s subtree: a call's
/// callee name is the member property / field / selector's field / scoped
/// identifier tail, never the whole receiver expression (`spec.md` §4.3.2).
pub(crate) fn rightmost_identifier<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    const IDENT_KINDS: &[&str] = &[
        "identifier",
        "property_identifier",
        "field_identifier",
        "type_identifier",
    ];

    if IDENT_KINDS.contains(&node.kind()) {
        return Some(node_text(node, source));
    }

    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    for child in children.into_iter().rev() {
        if let Some(found) = rightmost_identifier(child, source) {
            return Some(found);
        }
    }
    None
}

/// First up to three lines of `node`'s text, truncated to <= 200 bytes,
/// matching `spec.md`'s signature-extraction rule.
pub(crate) fn signature_of(node: Node, source: &str) -> Option<String> {
    let text = node_text(node, source);
    if text.is_empty() {
        return None;
    }
    Some(crate::types::extract_signature(text))
}

/// Find the first direct child whose kind is one of `kinds`.
pub(crate) fn first_child_of_kind<'a>(node: Node<'a>, kinds: &[&str]) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| kinds.contains(&c.kind()))
}
