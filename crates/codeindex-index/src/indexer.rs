//! Indexer (`spec.md` §4.5).
//!
//! Walks the configured root with `ignore::WalkBuilder` (respects
//! `.gitignore` the way a source-aware scan should), filters through a
//! `globset::GlobSet` built from `Config::include`/`exclude`, and replaces
//! each file's rows via [`crate::store::Store::reindex_file`]. Content
//! hashing (`sha2`) drives the incremental skip of `spec.md` §8 invariant 4.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use codeindex_core::{ExtractOptions, GrammarRegistry, LanguageTag};

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::store::Store;

/// Reported once per file as `indexAll`/`rebuild` progress.
#[derive(Debug, Clone)]
pub struct IndexProgress<'a> {
    pub path: &'a Path,
    pub files_done: usize,
    pub files_total: usize,
}

/// Totals returned by a full or incremental index pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexSummary {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| IndexError::Glob(e.to_string()))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| IndexError::Glob(e.to_string()))
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Owns the store, the grammar registry, and the include/exclude matchers
/// for one configured root.
pub struct Indexer {
    config: Config,
    store: Store,
    registry: GrammarRegistry,
    include: GlobSet,
    exclude: GlobSet,
}

impl Indexer {
    pub fn new(config: Config, store: Store) -> Result<Self> {
        let registry = GrammarRegistry::new(&config.languages).map_err(|e| IndexError::Config(e.to_string()))?;
        let include = build_globset(&config.include)?;
        let exclude = build_globset(&config.exclude)?;
        Ok(Self { config, store, registry, include, exclude })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn relative_path<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.config.root_dir).ok()
    }

    fn eligible(&self, relative: &str) -> bool {
        if !self.include.is_match(relative) {
            return false;
        }
        if self.exclude.is_match(relative) {
            return false;
        }
        true
    }

    /// Enumerate every eligible file under the configured root, honoring
    /// `.gitignore` via `ignore::WalkBuilder`.
    fn walk(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let walker = ignore::WalkBuilder::new(&self.config.root_dir).build();
        for entry in walker.flatten() {
            let Some(file_type) = entry.file_type() else { continue };
            if !file_type.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(relative) = self.relative_path(path) else { continue };
            let relative_str = relative.to_string_lossy().replace('\\', "/");
            if !self.eligible(&relative_str) {
                continue;
            }
            if LanguageTag::from_path(path).is_none() {
                continue;
            }
            out.push(path.to_path_buf());
        }
        out
    }

    /// Index every eligible file under the root, skipping unchanged content
    /// (`spec.md` §8 invariant 4 / scenario S4). `progress` is invoked once
    /// per file attempted, successful or not.
    pub fn index_all(&mut self, mut progress: impl FnMut(IndexProgress<'_>)) -> Result<IndexSummary> {
        let files = self.walk();
        let total = files.len();
        let mut summary = IndexSummary { files_scanned: total, ..Default::default() };

        for (done, path) in files.iter().enumerate() {
            match self.index_file(path) {
                Ok(true) => summary.files_indexed += 1,
                Ok(false) => summary.files_skipped += 1,
                Err(err) => {
                    summary.files_failed += 1;
                    warn!(path = %path.display(), error = %err, "failed to index file");
                }
            }
            progress(IndexProgress { path, files_done: done + 1, files_total: total });
        }

        info!(
            scanned = summary.files_scanned,
            indexed = summary.files_indexed,
            skipped = summary.files_skipped,
            failed = summary.files_failed,
            "index pass complete"
        );
        Ok(summary)
    }

    /// Index a single file. Returns `Ok(false)` when its content hash
    /// matches the stored one and the file was skipped untouched.
    pub fn index_file(&mut self, path: &Path) -> Result<bool> {
        let Some(language) = LanguageTag::from_path(path) else {
            debug!(path = %path.display(), "unsupported extension, skipping");
            return Ok(false);
        };
        if !self.config.languages.contains(&language) {
            debug!(path = %path.display(), language = language.name(), "language disabled in config, skipping");
            return Ok(false);
        }

        let relative = self
            .relative_path(path)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let bytes = std::fs::read(path).map_err(|source| IndexError::Io { path: path.to_path_buf(), source })?;
        let hash = content_hash(&bytes);

        if let Some(existing) = self.store.get_file_by_path(&relative)? {
            if existing.content_hash == hash {
                return Ok(false);
            }
        }

        let source = String::from_utf8_lossy(&bytes).into_owned();
        let tree = self
            .registry
            .parse(&source, language)
            .map_err(|e| IndexError::Config(e.to_string()))?;
        let options = ExtractOptions { max_nested_struct_depth: self.config.max_nested_struct_depth };
        let record = codeindex_core::extract(&source, &tree, language, &options);

        let metadata = std::fs::metadata(path).map_err(|source| IndexError::Io { path: path.to_path_buf(), source })?;
        let mtime: DateTime<Utc> = metadata.modified().map(DateTime::from).unwrap_or_else(|_| Utc::now());

        let (_, stats) = self.store.reindex_file(&relative, language, &hash, mtime, bytes.len() as i64, &record)?;
        debug!(
            path = %relative,
            symbols = stats.symbols_written,
            calls = stats.calls_written,
            references = stats.references_written,
            "reindexed file"
        );
        Ok(true)
    }

    /// Drop every row and reindex the whole root from scratch, then
    /// `VACUUM` the database.
    pub fn rebuild(&mut self, progress: impl FnMut(IndexProgress<'_>)) -> Result<IndexSummary> {
        self.store.clear_all()?;
        let summary = self.index_all(progress)?;
        self.store.compact()?;
        Ok(summary)
    }

    /// Release this indexer's handle onto the store (`spec.md` §4.5's
    /// `close`). The underlying connection is actually closed once every
    /// clone of the [`Store`] handle — indexer, query engine, watcher — has
    /// been dropped; this just drops this indexer's share of it.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(root: &Path) -> Config {
        Config::new(root.to_path_buf(), root.join("index.db"))
    }

    #[test]
    fn indexes_a_small_tree_and_skips_unchanged_on_rerun() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.rs"), "fn a() { b(); }\nfn b() {}\n").unwrap();
        std::fs::write(tmp.path().join("readme.md"), "not code").unwrap();

        let store = Store::open_in_memory().unwrap();
        let mut indexer = Indexer::new(config_for(tmp.path()), store.clone()).unwrap();

        let first = indexer.index_all(|_| {}).unwrap();
        assert_eq!(first.files_indexed, 1, "only a.rs should match a supported extension");

        let second = indexer.index_all(|_| {}).unwrap();
        assert_eq!(second.files_indexed, 0, "unchanged content must be skipped");
        assert_eq!(second.files_skipped, 1);

        let symbols = store.find_symbols("a", None, None).unwrap();
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn reindexes_after_content_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.rs");
        std::fs::write(&file, "fn a() {}\n").unwrap();

        let store = Store::open_in_memory().unwrap();
        let mut indexer = Indexer::new(config_for(tmp.path()), store.clone()).unwrap();
        indexer.index_all(|_| {}).unwrap();

        std::fs::write(&file, "fn a() {}\nfn c() {}\n").unwrap();
        let changed = indexer.index_file(&file).unwrap();
        assert!(changed, "changed content must not be skipped");
        assert_eq!(store.find_symbols("c", None, None).unwrap().len(), 1);
    }

    #[test]
    fn rebuild_clears_prior_state() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.rs"), "fn a() {}\n").unwrap();

        let store = Store::open_in_memory().unwrap();
        let mut indexer = Indexer::new(config_for(tmp.path()), store.clone()).unwrap();
        indexer.index_all(|_| {}).unwrap();

        std::fs::remove_file(tmp.path().join("a.rs")).unwrap();
        std::fs::write(tmp.path().join("b.rs"), "fn b() {}\n").unwrap();
        indexer.rebuild(|_| {}).unwrap();

        assert!(store.find_symbols("a", None, None).unwrap().is_empty());
        assert_eq!(store.find_symbols("b", None, None).unwrap().len(), 1);
    }
}
