//! Query engine (`spec.md` §4.6).

use std::collections::HashSet;

use codeindex_core::{LanguageTag, SymbolKind};

use crate::error::Result;
use crate::store::SymbolRow;
use crate::Store;

const DEFAULT_CALL_CHAIN_DEPTH: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Forward,
    Backward,
}

/// A resolved file + span for a symbol (`spec.md` §9's "resolve, don't leave
/// blank" prescription for `getReferences`).
#[derive(Debug, Clone)]
pub struct Location {
    pub file_id: i64,
    pub path: String,
    pub span: codeindex_core::Span,
}

#[derive(Debug, Clone)]
pub struct CallChainNode {
    pub symbol_id: i64,
    pub name: String,
    pub qualified_name: String,
    pub location: Option<Location>,
    pub depth: u32,
    pub children: Vec<CallChainNode>,
}

#[derive(Debug, Clone)]
pub struct SemanticMatch {
    pub symbol: SymbolRow,
    pub location: Option<Location>,
    pub similarity: f32,
}

pub struct QueryEngine {
    store: Store,
}

impl QueryEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn find_symbols(
        &self,
        name: &str,
        language: Option<LanguageTag>,
        kind: Option<SymbolKind>,
    ) -> Result<Vec<SymbolRow>> {
        self.store.find_symbols(name, language, kind)
    }

    /// Single-match convenience: apply `in_file` (substring filter on the
    /// owning file's path), then `kind`, returning the first remaining row.
    pub fn find_symbol(
        &self,
        name: &str,
        language: Option<LanguageTag>,
        in_file: Option<&str>,
        kind: Option<SymbolKind>,
    ) -> Result<Option<SymbolRow>> {
        let candidates = self.store.find_symbols(name, language, None)?;

        let filtered: Vec<SymbolRow> = if let Some(substr) = in_file {
            let mut out = Vec::new();
            for symbol in candidates {
                if let Some(file) = self.store.get_file(symbol.file_id)? {
                    if file.path.contains(substr) {
                        out.push(symbol);
                    }
                }
            }
            out
        } else {
            candidates
        };

        let filtered: Vec<SymbolRow> = if let Some(k) = kind {
            filtered.into_iter().filter(|s| s.kind == k).collect()
        } else {
            filtered
        };

        Ok(filtered.into_iter().next())
    }

    pub fn get_definition(&self, symbol_id: i64) -> Result<Option<Location>> {
        let Some(symbol) = self.store.get_symbol(symbol_id)? else { return Ok(None) };
        self.resolve_location(symbol.file_id, symbol.span).map(Some)
    }

    pub fn get_references(&self, symbol_id: i64) -> Result<Vec<(Location, codeindex_core::ReferenceKind)>> {
        let rows = self.store.get_references(symbol_id)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let location = self.resolve_location(row.source_file_id, row.span)?;
            out.push((location, row.kind));
        }
        Ok(out)
    }

    fn resolve_location(&self, file_id: i64, span: codeindex_core::Span) -> Result<Location> {
        let path = self.store.get_file(file_id)?.map(|f| f.path).unwrap_or_default();
        Ok(Location { file_id, path, span })
    }

    pub fn build_call_chain(&self, from: i64, direction: CallDirection, depth: Option<u32>) -> Result<Option<CallChainNode>> {
        let max_depth = depth.unwrap_or(DEFAULT_CALL_CHAIN_DEPTH);
        let mut visited = HashSet::new();
        self.build_node(from, direction, 0, max_depth, &mut visited)
    }

    fn build_node(
        &self,
        symbol_id: i64,
        direction: CallDirection,
        depth: u32,
        max_depth: u32,
        visited: &mut HashSet<i64>,
    ) -> Result<Option<CallChainNode>> {
        let Some(symbol) = self.store.get_symbol(symbol_id)? else { return Ok(None) };
        visited.insert(symbol_id);

        let location = self.resolve_location(symbol.file_id, symbol.span).ok();
        let mut node = CallChainNode {
            symbol_id,
            name: symbol.name,
            qualified_name: symbol.qualified_name,
            location,
            depth,
            children: Vec::new(),
        };

        if depth >= max_depth {
            return Ok(Some(node));
        }

        let edges = match direction {
            CallDirection::Forward => self.store.outgoing_calls(symbol_id)?,
            CallDirection::Backward => self.store.incoming_calls(symbol_id)?,
        };

        for edge in edges {
            let next_id = match direction {
                CallDirection::Forward => edge.callee_id,
                CallDirection::Backward => edge.caller_id,
            };
            if visited.contains(&next_id) {
                continue;
            }
            if let Some(child) = self.build_node(next_id, direction, depth + 1, max_depth, visited)? {
                node.children.push(child);
            }
        }

        Ok(Some(node))
    }

    /// Resolve a class/interface/struct by short name, then enumerate its
    /// method/property/field members (`spec.md` §4.6).
    pub fn get_object_properties(&self, name: &str, language: Option<LanguageTag>) -> Result<Vec<SymbolRow>> {
        let owners = self.store.find_symbols(name, language, None)?;
        let Some(owner) = owners
            .into_iter()
            .find(|s| matches!(s.kind, SymbolKind::Class | SymbolKind::Interface | SymbolKind::Struct))
        else {
            return Ok(Vec::new());
        };

        let go_patterns = if language == Some(LanguageTag::Go) || owner.language == LanguageTag::Go {
            vec![format!("{name}."), format!("(*{name})."), format!(".{name}.")]
        } else {
            Vec::new()
        };

        self.store.members_of(&owner.qualified_name, &go_patterns)
    }

    /// Cosine-similarity search over packed little-endian f32 embeddings,
    /// rescaled from [-1, 1] to [0, 1] via `(s + 1) / 2` (`spec.md` §4.6, §9).
    pub fn semantic_search(
        &self,
        query_vector: &[f32],
        model: &str,
        top_k: usize,
        language: Option<LanguageTag>,
        kind: Option<SymbolKind>,
        min_similarity: f32,
    ) -> Result<Vec<SemanticMatch>> {
        let rows = self.store.embeddings_for_model(model)?;
        let mut matches = Vec::new();

        for row in rows {
            let vector = decode_f32_le(&row.payload);
            if vector.len() != query_vector.len() {
                continue;
            }
            let Some(symbol) = self.store.get_symbol(row.symbol_id)? else { continue };
            if let Some(lang) = language {
                if symbol.language != lang {
                    continue;
                }
            }
            if let Some(k) = kind {
                if symbol.kind != k {
                    continue;
                }
            }

            let dot: f32 = vector.iter().zip(query_vector.iter()).map(|(a, b)| a * b).sum();
            let similarity = (dot + 1.0) / 2.0;
            if similarity < min_similarity {
                continue;
            }

            let location = self.resolve_location(symbol.file_id, symbol.span).ok();
            matches.push(SemanticMatch { symbol, location, similarity });
        }

        matches.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }
}

fn decode_f32_le(payload: &[u8]) -> Vec<f32> {
    payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Packs a vector into the little-endian f32 blob format embeddings are
/// stored as.
pub fn encode_f32_le(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use codeindex_core::{ExtractOptions, GrammarRegistry};

    fn store_with(source: &str, path: &str) -> Store {
        let store = Store::open_in_memory().unwrap();
        let mut registry = GrammarRegistry::new(&[LanguageTag::Rust]).unwrap();
        let tree = registry.parse(source, LanguageTag::Rust).unwrap();
        let record = codeindex_core::extract(source, &tree, LanguageTag::Rust, &ExtractOptions::default());
        store.reindex_file(path, LanguageTag::Rust, "h", Utc::now(), source.len() as i64, &record).unwrap();
        store
    }

    #[test]
    fn s5_call_chain_with_cycle_is_suppressed() {
        let store = Store::open_in_memory().unwrap();
        let mut registry = GrammarRegistry::new(&[LanguageTag::Rust]).unwrap();
        let source = "fn a() { b(); }\nfn b() { a(); }\n";
        let tree = registry.parse(source, LanguageTag::Rust).unwrap();
        let record = codeindex_core::extract(source, &tree, LanguageTag::Rust, &ExtractOptions::default());
        store.reindex_file("cycle.rs", LanguageTag::Rust, "h", Utc::now(), source.len() as i64, &record).unwrap();

        let engine = QueryEngine::new(store.clone());
        let a = engine.find_symbol("a", None, None, None).unwrap().unwrap();
        let chain = engine.build_call_chain(a.id, CallDirection::Forward, Some(5)).unwrap().unwrap();
        assert_eq!(chain.name, "a");
        assert_eq!(chain.children.len(), 1);
        let b_node = &chain.children[0];
        assert_eq!(b_node.name, "b");
        assert!(b_node.children.is_empty(), "cycle back to a must be suppressed by the visited set");
    }

    #[test]
    fn find_symbol_applies_in_file_then_kind() {
        let store = store_with("fn helper() {}\n", "util.rs");
        let engine = QueryEngine::new(store);
        let found = engine.find_symbol("helper", None, Some("util"), None).unwrap();
        assert!(found.is_some());
        let missing = engine.find_symbol("helper", None, Some("nope"), None).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn s6_semantic_search_ordering() {
        let store = Store::open_in_memory().unwrap();
        let ids: Vec<i64> = {
            let mut registry = GrammarRegistry::new(&[LanguageTag::Rust]).unwrap();
            let source = "fn a() {}\nfn b() {}\nfn c() {}\n";
            let tree = registry.parse(source, LanguageTag::Rust).unwrap();
            let record = codeindex_core::extract(source, &tree, LanguageTag::Rust, &ExtractOptions::default());
            store.reindex_file("three.rs", LanguageTag::Rust, "h", Utc::now(), source.len() as i64, &record).unwrap();
            let mut ids = Vec::new();
            for name in ["a", "b", "c"] {
                ids.push(store.find_symbols(name, None, None).unwrap()[0].id);
            }
            ids
        };

        store.upsert_embedding(ids[0], "M", 2, &encode_f32_le(&[1.0, 0.0]), "h").unwrap();
        store.upsert_embedding(ids[1], "M", 2, &encode_f32_le(&[0.0, 1.0]), "h").unwrap();
        let sqrt2_2 = std::f32::consts::FRAC_1_SQRT_2;
        store.upsert_embedding(ids[2], "M", 2, &encode_f32_le(&[sqrt2_2, sqrt2_2]), "h").unwrap();

        let engine = QueryEngine::new(store);
        let results = engine.semantic_search(&[1.0, 0.0], "M", 3, None, None, 0.7).unwrap();
        // The [0,1] vector rescales to 0.5 similarity and falls below min_similarity.
        assert_eq!(results.len(), 2);
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert!((results[0].similarity - 1.0).abs() < 1e-5);
        assert!((results[1].similarity - 0.8535).abs() < 1e-3);
    }
}
