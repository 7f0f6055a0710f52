//! codeindex-core — multi-language source extraction framework
//!
//! # Overview
//!
//! `codeindex-core` parses source files with tree-sitter and extracts a
//! language-neutral record of symbols, calls, and references. It has NO
//! I/O: callers pass in source text already read from disk (or a watcher
//! event), and get back [`ExtractionRecord`]s to persist however they like.
//!
//! # Architecture
//!
//! - [`GrammarRegistry`] loads and caches tree-sitter grammars per
//!   [`LanguageTag`].
//! - [`extract`] dispatches a parsed tree to one of seven per-language
//!   extractors, each a closed `match` over that language's node kinds.
//!
//! # Example
//!
//! ```no_run
//! use codeindex_core::{GrammarRegistry, LanguageTag, extract, ExtractOptions};
//!
//! let mut registry = GrammarRegistry::new(&[LanguageTag::Rust])?;
//! let source = "pub fn add(a: i32, b: i32) -> i32 { a + b }";
//! let tree = registry.parse(source, LanguageTag::Rust)?;
//! let record = extract(source, &tree, LanguageTag::Rust, &ExtractOptions::default());
//! assert_eq!(record.symbols.len(), 1);
//! # Ok::<(), codeindex_core::CoreError>(())
//! ```

mod extract;
mod registry;
mod types;

pub use extract::{extract, ExtractOptions};
pub use registry::GrammarRegistry;
pub use types::{
    extract_signature, CoreError, ExtractedCall, ExtractedReference, ExtractedSymbol,
    ExtractionRecord, LanguageTag, ReferenceKind, Result, Span, SymbolKind,
};

/// All language tags this crate can extract, in a stable order used for
/// CLI `--language` listings and config validation.
pub fn supported_languages() -> &'static [LanguageTag] {
    &[
        LanguageTag::Typescript,
        LanguageTag::Tsx,
        LanguageTag::Javascript,
        LanguageTag::Jsx,
        LanguageTag::Go,
        LanguageTag::Python,
        LanguageTag::Rust,
        LanguageTag::Java,
        LanguageTag::Html,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_languages_covers_every_tag() {
        assert_eq!(supported_languages().len(), 9);
    }

    #[test]
    fn end_to_end_rust_extraction() {
        let mut registry = GrammarRegistry::new(&[LanguageTag::Rust]).unwrap();
        let source = "pub fn add(a: i32, b: i32) -> i32 { a + b }";
        let tree = registry.parse(source, LanguageTag::Rust).unwrap();
        let record = extract(source, &tree, LanguageTag::Rust, &ExtractOptions::default());
        assert_eq!(record.symbols.len(), 1);
        assert_eq!(record.symbols[0].name, "add");
        assert!(record.symbols[0].exported);
    }
}
