//! Grammar registry — maps a language tag to a loaded tree-sitter grammar
//!
//! ARCHITECTURE: This is the ONLY module that loads tree-sitter grammars.
//! Generalizes `Parser::new`/`Language::to_tree_sitter` from the
//! transformation-era core: instead of re-resolving a grammar on every
//! parser construction, a `GrammarRegistry` loads each requested tag once
//! and caches it, so repeated `parse` calls across many files in an index
//! run never redo that work.

use std::collections::HashMap;

use crate::types::{CoreError, LanguageTag, Result};

fn to_tree_sitter(tag: LanguageTag) -> tree_sitter::Language {
    match tag {
        LanguageTag::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        LanguageTag::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        LanguageTag::Javascript | LanguageTag::Jsx => tree_sitter_javascript::LANGUAGE.into(),
        LanguageTag::Go => tree_sitter_go::LANGUAGE.into(),
        LanguageTag::Python => tree_sitter_python::LANGUAGE.into(),
        LanguageTag::Rust => tree_sitter_rust::LANGUAGE.into(),
        LanguageTag::Java => tree_sitter_java::LANGUAGE.into(),
        LanguageTag::Html => tree_sitter_html::LANGUAGE.into(),
    }
}

/// Loads and caches tree-sitter grammars on demand.
///
/// Construct one registry with the set of tags a caller actually needs
/// (typically `Config::languages`); requesting an unconfigured tag fails
/// fast with `CoreError::UnsupportedLanguage` (`spec.md` §4.1).
pub struct GrammarRegistry {
    languages: HashMap<LanguageTag, tree_sitter::Language>,
}

impl GrammarRegistry {
    /// Load grammars for exactly the requested tags.
    pub fn new(tags: &[LanguageTag]) -> Result<Self> {
        let mut languages = HashMap::with_capacity(tags.len());
        for &tag in tags {
            languages.entry(tag).or_insert_with(|| to_tree_sitter(tag));
        }
        Ok(Self { languages })
    }

    /// Load grammars for every supported language tag.
    pub fn with_all_languages() -> Self {
        const ALL: &[LanguageTag] = &[
            LanguageTag::Typescript,
            LanguageTag::Tsx,
            LanguageTag::Javascript,
            LanguageTag::Jsx,
            LanguageTag::Go,
            LanguageTag::Python,
            LanguageTag::Rust,
            LanguageTag::Java,
            LanguageTag::Html,
        ];
        // Loading a grammar constant can never fail, so this is infallible.
        #[allow(clippy::expect_used)]
        Self::new(ALL).expect("loading a static grammar table cannot fail")
    }

    /// Which tag (if any) the given path's extension maps to.
    pub fn language_for_path(&self, path: &std::path::Path) -> Option<LanguageTag> {
        LanguageTag::from_path(path)
    }

    /// Parse `source` as `tag`. Fails only if the tag's grammar was not
    /// loaded into this registry, or tree-sitter itself cannot build a tree
    /// (which in practice only happens for a misconfigured parser, not for
    /// malformed source — tree-sitter is error-tolerant and always returns a
    /// tree for any byte sequence).
    pub fn parse(&mut self, source: &str, tag: LanguageTag) -> Result<tree_sitter::Tree> {
        let language = self
            .languages
            .get(&tag)
            .ok_or_else(|| CoreError::UnsupportedLanguage(tag.name().to_string()))?
            .clone();

        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&language)?;
        parser
            .parse(source, None)
            .ok_or_else(|| CoreError::ParseFailed(tag.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_configured_language() {
        let mut registry = GrammarRegistry::with_all_languages();
        let cases: &[(LanguageTag, &str)] = &[
            (LanguageTag::Typescript, "function test(): void {}"),
            (LanguageTag::Tsx, "const x = <div />;"),
            (LanguageTag::Javascript, "function test() {}"),
            (LanguageTag::Jsx, "const x = <div />;"),
            (LanguageTag::Python, "def test():\n    pass"),
            (LanguageTag::Rust, "fn test() {}"),
            (LanguageTag::Go, "package p\nfunc test() {}"),
            (LanguageTag::Java, "class Test { void test() {} }"),
            (LanguageTag::Html, "<div id=\"x\"></div>"),
        ];

        for &(tag, source) in cases {
            let tree = registry.parse(source, tag);
            assert!(tree.is_ok(), "failed to parse {:?}", tag);
        }
    }

    #[test]
    fn rejects_tag_not_loaded() {
        let mut registry = GrammarRegistry::new(&[LanguageTag::Rust]).unwrap();
        let result = registry.parse("def x(): pass", LanguageTag::Python);
        assert!(matches!(result, Err(CoreError::UnsupportedLanguage(_))));
    }

    #[test]
    fn tree_sitter_is_error_tolerant() {
        let mut registry = GrammarRegistry::new(&[LanguageTag::Typescript]).unwrap();
        let result = registry.parse("function {{{{{ broken", LanguageTag::Typescript);
        assert!(result.is_ok());
    }
}
