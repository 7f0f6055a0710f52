//! codeindex-index — persistent store, incremental indexer, query engine,
//! and file-system watcher
//!
//! # Overview
//!
//! Built on top of `codeindex-core`'s extraction framework: this crate owns
//! every piece of I/O the system needs — the SQLite-backed [`Store`], the
//! [`Indexer`] that walks a directory tree and keeps it in sync, the
//! [`QueryEngine`] that answers symbol/call/reference/semantic queries, the
//! [`Watcher`] that reacts to live filesystem changes, and the `collab`
//! module modeling the summarizer/embedding-generator fan-out.

mod collab;
mod config;
mod error;
mod indexer;
mod query;
mod store;
mod watch;

pub use collab::{
    run_batch, BatchOutcome, CollabError, EmbeddingGenerator, EmbeddingUpdate, HttpEmbeddingGenerator,
    HttpSummarizer, Summarizer, SummaryUpdate,
};
pub use config::Config;
pub use error::{IndexError, Result};
pub use indexer::{IndexProgress, IndexSummary, Indexer};
pub use query::{CallChainNode, CallDirection, Location, QueryEngine, SemanticMatch};
pub use store::{CallRow, EmbeddingRow, FileRow, ReferenceRow, ReindexStats, Store, SymbolRow};
pub use watch::{IncludeMatcher, Watcher};
