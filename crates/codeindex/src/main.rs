//! codeindex CLI - command-line front-end for the indexing and query engine
//!
//! ARCHITECTURE: thin I/O layer over `codeindex-index`. This binary handles
//! CLI argument parsing (`clap`), building a `Config` directly from flags
//! (per `spec.md` §1, the config-file loader itself stays an external
//! collaborator), wiring the indexer/query engine/watcher together, and
//! formatting results as JSON on stdout. Library errors are collected behind
//! `anyhow::Result` at this boundary, matching the teacher's binary-vs-library
//! error split.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use codeindex_core::{LanguageTag, SymbolKind};
use codeindex_index::{CallDirection, Config, Indexer, QueryEngine, Store, Watcher};

/// codeindex - multi-language source-code indexing and query engine
#[derive(Parser, Debug)]
#[command(name = "codeindex")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory to index (defaults to the current directory)
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Path to the SQLite index database
    #[arg(long, global = true, default_value = "codeindex.db")]
    db: PathBuf,

    /// Restrict to these languages (repeatable); defaults to all supported
    #[arg(long = "language", global = true)]
    languages: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index every eligible file under the root, skipping unchanged content
    Index,
    /// Drop all stored data and reindex the root from scratch
    Rebuild,
    /// Watch the root for changes and keep the index up to date
    Watch,
    /// Find symbols by name
    Find {
        name: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long = "in-file")]
        in_file: Option<String>,
    },
    /// Show a symbol's definition location
    Definition { symbol_id: i64 },
    /// Show every reference to a symbol
    References { symbol_id: i64 },
    /// Build a forward or backward call chain from a symbol
    CallChain {
        symbol_id: i64,
        #[arg(long, value_enum, default_value = "forward")]
        direction: DirectionArg,
        #[arg(long)]
        depth: Option<u32>,
    },
    /// List the members (methods/properties/fields) of a class/interface/struct
    Members { name: String },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum DirectionArg {
    Forward,
    Backward,
}

impl From<DirectionArg> for CallDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Forward => CallDirection::Forward,
            DirectionArg::Backward => CallDirection::Backward,
        }
    }
}

fn build_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::new(args.root.clone(), args.db.clone());
    if !args.languages.is_empty() {
        let mut tags = Vec::with_capacity(args.languages.len());
        for name in &args.languages {
            let tag = LanguageTag::parse(name).ok_or_else(|| anyhow::anyhow!("unknown language: {name}"))?;
            tags.push(tag);
        }
        config.languages = tags;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let store = Store::open(&config.db_path)?;

    match &args.command {
        Command::Index => {
            let mut indexer = Indexer::new(config, store)?;
            let summary = indexer.index_all(|p| {
                tracing::debug!(path = %p.path.display(), done = p.files_done, total = p.files_total, "indexing");
            })?;
            println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?);
        }
        Command::Rebuild => {
            let mut indexer = Indexer::new(config, store)?;
            let summary = indexer.rebuild(|p| {
                tracing::debug!(path = %p.path.display(), done = p.files_done, total = p.files_total, "rebuilding");
            })?;
            println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?);
        }
        Command::Watch => {
            let mut indexer = Indexer::new(config.clone(), store)?;
            let mut watcher = Watcher::new(config);
            // A signal-handling crate is out of scope for this thin front-end;
            // `stop` never flips, so the loop runs until the process is killed.
            let stop = Arc::new(AtomicBool::new(false));
            watcher.run(&mut indexer, &stop)?;
        }
        Command::Find { name, kind, in_file } => {
            let engine = QueryEngine::new(store);
            let kind = kind.as_deref().map(parse_kind).transpose()?;
            let symbols = if in_file.is_some() {
                engine.find_symbol(name, None, in_file.as_deref(), kind)?.into_iter().collect::<Vec<_>>()
            } else {
                engine.find_symbols(name, None, kind)?
            };
            println!("{}", serde_json::to_string_pretty(&symbols.iter().map(symbol_json).collect::<Vec<_>>())?);
        }
        Command::Definition { symbol_id } => {
            let engine = QueryEngine::new(store);
            let location = engine.get_definition(*symbol_id)?;
            println!("{}", serde_json::to_string_pretty(&location.map(|l| location_json(&l)))?);
        }
        Command::References { symbol_id } => {
            let engine = QueryEngine::new(store);
            let references = engine.get_references(*symbol_id)?;
            let json: Vec<_> = references.iter().map(|(loc, kind)| {
                serde_json::json!({ "location": location_json(loc), "kind": kind.name() })
            }).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Command::CallChain { symbol_id, direction, depth } => {
            let engine = QueryEngine::new(store);
            let chain = engine.build_call_chain(*symbol_id, (*direction).into(), *depth)?;
            println!("{}", serde_json::to_string_pretty(&chain.map(|c| call_chain_json(&c)))?);
        }
        Command::Members { name } => {
            let engine = QueryEngine::new(store);
            let members = engine.get_object_properties(name, None)?;
            println!("{}", serde_json::to_string_pretty(&members.iter().map(symbol_json).collect::<Vec<_>>())?);
        }
    }

    Ok(())
}

fn parse_kind(raw: &str) -> anyhow::Result<SymbolKind> {
    SymbolKind::parse(raw).ok_or_else(|| anyhow::anyhow!("unknown symbol kind: {raw}"))
}

fn summary_json(summary: &codeindex_index::IndexSummary) -> serde_json::Value {
    serde_json::json!({
        "filesScanned": summary.files_scanned,
        "filesIndexed": summary.files_indexed,
        "filesSkipped": summary.files_skipped,
        "filesFailed": summary.files_failed,
    })
}

fn symbol_json(symbol: &codeindex_index::SymbolRow) -> serde_json::Value {
    serde_json::json!({
        "id": symbol.id,
        "name": symbol.name,
        "qualifiedName": symbol.qualified_name,
        "kind": symbol.kind.name(),
        "language": symbol.language.name(),
        "exported": symbol.exported,
        "startLine": symbol.span.start_line,
        "endLine": symbol.span.end_line,
    })
}

fn location_json(location: &codeindex_index::Location) -> serde_json::Value {
    serde_json::json!({
        "path": location.path,
        "startLine": location.span.start_line,
        "startColumn": location.span.start_column,
        "endLine": location.span.end_line,
        "endColumn": location.span.end_column,
    })
}

fn call_chain_json(node: &codeindex_index::CallChainNode) -> serde_json::Value {
    serde_json::json!({
        "symbolId": node.symbol_id,
        "name": node.name,
        "qualifiedName": node.qualified_name,
        "depth": node.depth,
        "location": node.location.as_ref().map(location_json),
        "children": node.children.iter().map(call_chain_json).collect::<Vec<_>>(),
    })
}
