//! Core type definitions for codeindex's extraction framework
//!
//! ARCHITECTURE: This module defines ALL language-neutral types produced by
//! an extractor. Design principle: type-first development with explicit
//! error handling, no panics in library code (enforced by clippy lints).

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Language tags
// ============================================================================

/// Supported language tags.
///
/// One tag per entry in the fixed extension table; `Typescript`/`Tsx` and
/// `Javascript`/`Jsx` are distinct tags even though pairs of them share a
/// grammar crate, because the extension mapping treats them as distinct
/// languages (`spec.md` §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    Typescript,
    Tsx,
    Javascript,
    Jsx,
    Go,
    Python,
    Rust,
    Java,
    Html,
}

impl LanguageTag {
    /// Detect a language tag from a bare file extension (no leading dot).
    ///
    /// Mapping fixed by `spec.md` §4.1: other extensions return `None` and
    /// are skipped by the indexer.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" => Some(Self::Javascript),
            "jsx" => Some(Self::Jsx),
            "ts" | "mts" | "cts" => Some(Self::Typescript),
            "tsx" => Some(Self::Tsx),
            "go" => Some(Self::Go),
            "py" | "pyw" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            "java" => Some(Self::Java),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    /// Detect a language tag from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Display name, used in logs and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Typescript => "typescript",
            Self::Tsx => "tsx",
            Self::Javascript => "javascript",
            Self::Jsx => "jsx",
            Self::Go => "go",
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Java => "java",
            Self::Html => "html",
        }
    }

    /// Parse a tag back from its display name (used by CLI `--language` filters).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "typescript" | "ts" => Some(Self::Typescript),
            "tsx" => Some(Self::Tsx),
            "javascript" | "js" => Some(Self::Javascript),
            "jsx" => Some(Self::Jsx),
            "go" => Some(Self::Go),
            "python" | "py" => Some(Self::Python),
            "rust" | "rs" => Some(Self::Rust),
            "java" => Some(Self::Java),
            "html" => Some(Self::Html),
            _ => None,
        }
    }
}

// ============================================================================
// Symbol kinds
// ============================================================================

/// Closed set of symbol kinds a language extractor may emit (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Struct,
    Variable,
    Constant,
    Property,
    Field,
    Module,
    Namespace,
    Type,
}

impl SymbolKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Struct => "struct",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Property => "property",
            Self::Field => "field",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Type => "type",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(Self::Function),
            "method" => Some(Self::Method),
            "class" => Some(Self::Class),
            "interface" => Some(Self::Interface),
            "struct" => Some(Self::Struct),
            "variable" => Some(Self::Variable),
            "constant" => Some(Self::Constant),
            "property" => Some(Self::Property),
            "field" => Some(Self::Field),
            "module" => Some(Self::Module),
            "namespace" => Some(Self::Namespace),
            "type" => Some(Self::Type),
            _ => None,
        }
    }

    /// Kinds `getObjectProperties` (`spec.md` §4.6) enumerates as members.
    pub fn is_member_kind(self) -> bool {
        matches!(self, Self::Method | Self::Property | Self::Field)
    }
}

/// Non-call use of a name (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Read,
    Write,
    Import,
    Export,
    Extend,
    Implement,
    Call,
}

impl ReferenceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Import => "import",
            Self::Export => "export",
            Self::Extend => "extend",
            Self::Implement => "implement",
            Self::Call => "call",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "import" => Some(Self::Import),
            "export" => Some(Self::Export),
            "extend" => Some(Self::Extend),
            "implement" => Some(Self::Implement),
            "call" => Some(Self::Call),
            _ => None,
        }
    }
}

// ============================================================================
// Source span
// ============================================================================

/// Inclusive source span. Lines are 1-based, columns are 0-based
/// (`spec.md` §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    pub fn from_ts_node(node: &tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_line: start.row as u32 + 1,
            start_column: start.column as u32,
            end_line: end.row as u32 + 1,
            end_column: end.column as u32,
        }
    }

    /// Does `line` (1-based) fall within this span, inclusive?
    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Number of lines this span covers, used to pick the innermost (smallest)
    /// enclosing symbol when several qualify as a call's caller.
    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

// ============================================================================
// Extracted records (pre-persistence; no database identifiers yet)
// ============================================================================

/// A symbol as produced by an extractor, before it is assigned a file and a
/// database identifier.
#[derive(Debug, Clone)]
pub struct ExtractedSymbol {
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub span: Span,
    /// First up to three lines of the node text, truncated to <= 200 bytes.
    pub signature: Option<String>,
    pub exported: bool,
}

/// A call site referencing a callee by name (resolved to a symbol id later,
/// during indexing — see `spec.md` §4.5).
#[derive(Debug, Clone)]
pub struct ExtractedCall {
    pub callee_name: String,
    pub site_span: Span,
}

/// A non-call reference to a name.
#[derive(Debug, Clone)]
pub struct ExtractedReference {
    pub target_name: String,
    pub kind: ReferenceKind,
    pub span: Span,
}

/// The three-part output of extracting one file's syntax tree
/// (`spec.md` §4.2).
#[derive(Debug, Clone, Default)]
pub struct ExtractionRecord {
    pub symbols: Vec<ExtractedSymbol>,
    pub calls: Vec<ExtractedCall>,
    pub references: Vec<ExtractedReference>,
}

impl ExtractionRecord {
    pub fn merge(&mut self, other: ExtractionRecord) {
        self.symbols.extend(other.symbols);
        self.calls.extend(other.calls);
        self.references.extend(other.references);
    }
}

/// Truncate a node's source text to at most three lines and 200 bytes,
/// matching the signature-extraction rule of `spec.md` §3/§4.2.
pub fn extract_signature(text: &str) -> String {
    let mut lines = text.lines().take(3).collect::<Vec<_>>().join("\n");
    if lines.len() > 200 {
        // truncate at a char boundary at or before byte 200
        let mut end = 200;
        while end > 0 && !lines.is_char_boundary(end) {
            end -= 1;
        }
        lines.truncate(end);
    }
    lines
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("language unsupported: {0}")]
    UnsupportedLanguage(String),

    #[error("unsupported language for file: {0}")]
    UnsupportedPath(PathBuf),

    #[error("failed to parse source as {0}")]
    ParseFailed(String),

    #[error("tree-sitter language error: {0}")]
    TreeSitter(#[from] tree_sitter::LanguageError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_tag_from_extension() {
        assert_eq!(LanguageTag::from_extension("ts"), Some(LanguageTag::Typescript));
        assert_eq!(LanguageTag::from_extension("mts"), Some(LanguageTag::Typescript));
        assert_eq!(LanguageTag::from_extension("tsx"), Some(LanguageTag::Tsx));
        assert_eq!(LanguageTag::from_extension("jsx"), Some(LanguageTag::Jsx));
        assert_eq!(LanguageTag::from_extension("py"), Some(LanguageTag::Python));
        assert_eq!(LanguageTag::from_extension("rs"), Some(LanguageTag::Rust));
        assert_eq!(LanguageTag::from_extension("htm"), Some(LanguageTag::Html));
        assert_eq!(LanguageTag::from_extension("unknown"), None);
    }

    #[test]
    fn span_contains_line() {
        let span = Span { start_line: 3, start_column: 0, end_line: 7, end_column: 1 };
        assert!(span.contains_line(3));
        assert!(span.contains_line(7));
        assert!(!span.contains_line(8));
        assert_eq!(span.line_count(), 5);
    }

    #[test]
    fn signature_truncates_to_three_lines_and_200_bytes() {
        let text = "a\nb\nc\nd\ne";
        assert_eq!(extract_signature(text), "a\nb\nc");

        let long = "x".repeat(500);
        assert!(extract_signature(&long).len() <= 200);
    }
}
