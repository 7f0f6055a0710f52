//! Error taxonomy for the store, indexer, query engine, and watcher.
//!
//! Mirrors `codeindex_core::CoreError`'s shape: `thiserror` variants, `#[from]`
//! conversions at the I/O boundaries, one crate-local `Result` alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid glob pattern: {0}")]
    Glob(String),

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
