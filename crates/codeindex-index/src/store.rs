//! Persistent store (`spec.md` §3, §4.4).
//!
//! Wraps a single `rusqlite::Connection` (bundled SQLite, exactly the
//! teacher's `rusqlite` pin) behind a mutex so the indexer, query engine, and
//! watcher can share one handle across threads while still assuming exactly
//! one writer, per `spec.md` §5.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use codeindex_core::{ExtractionRecord, LanguageTag, ReferenceKind, Span, SymbolKind};

use crate::error::{IndexError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    language TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    mtime TEXT NOT NULL,
    size INTEGER NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS symbols (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    language TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL,
    signature TEXT,
    exported INTEGER NOT NULL,
    chunk_hash TEXT,
    chunk_summary TEXT,
    summary_tokens INTEGER,
    summarized_at TEXT
);

CREATE TABLE IF NOT EXISTS calls (
    id INTEGER PRIMARY KEY,
    caller_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    callee_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    site_file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS "references" (
    id INTEGER PRIMARY KEY,
    target_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    source_file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS embeddings (
    id INTEGER PRIMARY KEY,
    symbol_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    model TEXT NOT NULL,
    dim INTEGER NOT NULL,
    payload BLOB NOT NULL,
    chunk_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(symbol_id, model)
);

CREATE INDEX IF NOT EXISTS idx_files_content_hash ON files(content_hash);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
CREATE INDEX IF NOT EXISTS idx_symbols_qualified_name ON symbols(qualified_name);
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);
CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);
CREATE INDEX IF NOT EXISTS idx_calls_caller ON calls(caller_id);
CREATE INDEX IF NOT EXISTS idx_calls_callee ON calls(callee_id);
CREATE INDEX IF NOT EXISTS idx_references_target ON "references"(target_id);
CREATE INDEX IF NOT EXISTS idx_references_source_file ON "references"(source_file_id);
CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model);
CREATE INDEX IF NOT EXISTS idx_embeddings_chunk_hash ON embeddings(chunk_hash);
"#;

const SUMMARY_COLUMNS: &[(&str, &str)] = &[
    ("chunk_hash", "TEXT"),
    ("chunk_summary", "TEXT"),
    ("summary_tokens", "INTEGER"),
    ("summarized_at", "TEXT"),
];

#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: i64,
    pub path: String,
    pub language: LanguageTag,
    pub content_hash: String,
    pub mtime: DateTime<Utc>,
    pub size: i64,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SymbolRow {
    pub id: i64,
    pub file_id: i64,
    pub language: LanguageTag,
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub span: Span,
    pub signature: Option<String>,
    pub exported: bool,
    pub chunk_hash: Option<String>,
    pub chunk_summary: Option<String>,
    pub summary_tokens: Option<i64>,
    pub summarized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CallRow {
    pub id: i64,
    pub caller_id: i64,
    pub callee_id: i64,
    pub site_file_id: i64,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReferenceRow {
    pub id: i64,
    pub target_id: i64,
    pub kind: ReferenceKind,
    pub source_file_id: i64,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EmbeddingRow {
    pub id: i64,
    pub symbol_id: i64,
    pub model: String,
    pub dim: u32,
    pub payload: Vec<u8>,
    pub chunk_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of replacing one file's data: the file's stable id plus however
/// many symbol/call/reference rows were actually written (zero on an
/// incremental skip, per `spec.md` §8 invariant 4).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReindexStats {
    pub symbols_written: usize,
    pub calls_written: usize,
    pub references_written: usize,
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn kind_name(kind: SymbolKind) -> &'static str {
    kind.name()
}

/// An embedded, shareable handle onto the index's SQLite database.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Self::evolve_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Self::evolve_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Add any of the four summary columns missing from an older `symbols`
    /// table, in one transaction. A no-op on a freshly created database.
    fn evolve_schema(conn: &Connection) -> Result<()> {
        let mut existing = std::collections::HashSet::new();
        {
            let mut stmt = conn.prepare("PRAGMA table_info(symbols)")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let name: String = row.get(1)?;
                existing.insert(name);
            }
        }
        let missing: Vec<_> = SUMMARY_COLUMNS.iter().filter(|(name, _)| !existing.contains(*name)).collect();
        if missing.is_empty() {
            return Ok(());
        }
        conn.execute_batch("BEGIN;")?;
        for (name, ty) in missing {
            conn.execute(&format!("ALTER TABLE symbols ADD COLUMN {name} {ty}"), [])?;
        }
        conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn get_file_by_path(&self, path: &str) -> Result<Option<FileRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT id, path, language, content_hash, mtime, size, indexed_at FROM files WHERE path = ?1",
            params![path],
            Self::map_file_row,
        )
        .optional()
        .map_err(IndexError::from)
    }

    fn map_file_row(row: &rusqlite::Row) -> rusqlite::Result<FileRow> {
        let language: String = row.get(2)?;
        let mtime: String = row.get(4)?;
        let indexed_at: String = row.get(6)?;
        Ok(FileRow {
            id: row.get(0)?,
            path: row.get(1)?,
            language: LanguageTag::parse(&language).unwrap_or(LanguageTag::Rust),
            content_hash: row.get(3)?,
            mtime: parse_timestamp(&mtime),
            size: row.get(5)?,
            indexed_at: parse_timestamp(&indexed_at),
        })
    }

    /// Replace one file's symbols/calls/references with a fresh extraction,
    /// inside a single transaction (`spec.md` §4.4 "Transactional discipline").
    #[allow(clippy::too_many_arguments)]
    pub fn reindex_file(
        &self,
        relative_path: &str,
        language: LanguageTag,
        content_hash: &str,
        mtime: DateTime<Utc>,
        size: i64,
        record: &ExtractionRecord,
    ) -> Result<(i64, ReindexStats)> {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let existing_id: Option<i64> = tx
            .query_row("SELECT id FROM files WHERE path = ?1", params![relative_path], |r| r.get(0))
            .optional()?;

        if let Some(file_id) = existing_id {
            tx.execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id])?;
            tx.execute("DELETE FROM calls WHERE site_file_id = ?1", params![file_id])?;
            tx.execute("DELETE FROM \"references\" WHERE source_file_id = ?1", params![file_id])?;
        }

        let file_id = if let Some(id) = existing_id {
            tx.execute(
                "UPDATE files SET content_hash = ?1, mtime = ?2, size = ?3, indexed_at = ?4 WHERE id = ?5",
                params![content_hash, mtime.to_rfc3339(), size, now, id],
            )?;
            id
        } else {
            tx.execute(
                "INSERT INTO files (path, language, content_hash, mtime, size, indexed_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![relative_path, language.name(), content_hash, mtime.to_rfc3339(), size, now],
            )?;
            tx.last_insert_rowid()
        };

        let mut name_to_id: Vec<(String, i64)> = Vec::with_capacity(record.symbols.len());
        for symbol in &record.symbols {
            tx.execute(
                "INSERT INTO symbols (file_id, language, kind, name, qualified_name, start_line, start_column, end_line, end_column, signature, exported)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    file_id,
                    language.name(),
                    kind_name(symbol.kind),
                    symbol.name,
                    symbol.qualified_name,
                    symbol.span.start_line,
                    symbol.span.start_column,
                    symbol.span.end_line,
                    symbol.span.end_column,
                    symbol.signature,
                    symbol.exported as i64,
                ],
            )?;
            let id = tx.last_insert_rowid();
            name_to_id.push((symbol.name.clone(), id));
        }

        let find_caller = |call_start_line: u32| -> Option<i64> {
            record
                .symbols
                .iter()
                .zip(name_to_id.iter())
                .filter(|(sym, _)| sym.span.contains_line(call_start_line))
                .min_by_key(|(sym, _)| sym.span.line_count())
                .map(|(_, (_, id))| *id)
        };

        let find_symbol_id_by_name = |tx: &rusqlite::Transaction, name: &str| -> rusqlite::Result<Option<i64>> {
            tx.query_row("SELECT id FROM symbols WHERE name = ?1 ORDER BY id ASC LIMIT 1", params![name], |r| r.get(0)).optional()
        };

        let mut calls_written = 0usize;
        for call in &record.calls {
            let Some(caller_id) = find_caller(call.site_span.start_line) else { continue };
            let Some(callee_id) = find_symbol_id_by_name(&tx, &call.callee_name)? else { continue };
            tx.execute(
                "INSERT INTO calls (caller_id, callee_id, site_file_id, start_line, start_column, end_line, end_column)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    caller_id,
                    callee_id,
                    file_id,
                    call.site_span.start_line,
                    call.site_span.start_column,
                    call.site_span.end_line,
                    call.site_span.end_column,
                ],
            )?;
            calls_written += 1;
        }

        let mut references_written = 0usize;
        for reference in &record.references {
            let Some(target_id) = find_symbol_id_by_name(&tx, &reference.target_name)? else { continue };
            tx.execute(
                "INSERT INTO \"references\" (target_id, kind, source_file_id, start_line, start_column, end_line, end_column)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    target_id,
                    reference.kind.name(),
                    file_id,
                    reference.span.start_line,
                    reference.span.start_column,
                    reference.span.end_line,
                    reference.span.end_column,
                ],
            )?;
            references_written += 1;
        }

        tx.commit()?;
        Ok((
            file_id,
            ReindexStats { symbols_written: record.symbols.len(), calls_written, references_written },
        ))
    }

    pub fn delete_file(&self, file_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
        Ok(())
    }

    /// Delete a directory's subtree: every stored file whose path equals
    /// `dir_path` or has it as a `/`-prefix (`spec.md` §4.7).
    pub fn delete_directory(&self, dir_path: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let prefix = format!("{dir_path}/%");
        let count = conn.execute("DELETE FROM files WHERE path = ?1 OR path LIKE ?2", params![dir_path, prefix])?;
        Ok(count)
    }

    pub fn find_symbols(&self, name: &str, language: Option<LanguageTag>, kind: Option<SymbolKind>) -> Result<Vec<SymbolRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut sql = String::from(
            "SELECT id, file_id, language, kind, name, qualified_name, start_line, start_column, end_line, end_column, signature, exported, chunk_hash, chunk_summary, summary_tokens, summarized_at
             FROM symbols WHERE name = ?1",
        );
        if language.is_some() {
            sql.push_str(" AND language = ?2");
        }
        if kind.is_some() {
            sql.push_str(if language.is_some() { " AND kind = ?3" } else { " AND kind = ?2" });
        }
        sql.push_str(" ORDER BY qualified_name ASC");

        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<SymbolRow> = match (language, kind) {
            (Some(lang), Some(k)) => stmt
                .query_map(params![name, lang.name(), kind_name(k)], Self::map_symbol_row)?
                .collect::<rusqlite::Result<_>>()?,
            (Some(lang), None) => stmt
                .query_map(params![name, lang.name()], Self::map_symbol_row)?
                .collect::<rusqlite::Result<_>>()?,
            (None, Some(k)) => stmt
                .query_map(params![name, kind_name(k)], Self::map_symbol_row)?
                .collect::<rusqlite::Result<_>>()?,
            (None, None) => stmt.query_map(params![name], Self::map_symbol_row)?.collect::<rusqlite::Result<_>>()?,
        };
        Ok(rows)
    }

    pub fn get_symbol(&self, id: i64) -> Result<Option<SymbolRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT id, file_id, language, kind, name, qualified_name, start_line, start_column, end_line, end_column, signature, exported, chunk_hash, chunk_summary, summary_tokens, summarized_at
             FROM symbols WHERE id = ?1",
            params![id],
            Self::map_symbol_row,
        )
        .optional()
        .map_err(IndexError::from)
    }

    pub fn get_file(&self, id: i64) -> Result<Option<FileRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.query_row(
            "SELECT id, path, language, content_hash, mtime, size, indexed_at FROM files WHERE id = ?1",
            params![id],
            Self::map_file_row,
        )
        .optional()
        .map_err(IndexError::from)
    }

    pub fn get_references(&self, symbol_id: i64) -> Result<Vec<ReferenceRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT id, target_id, kind, source_file_id, start_line, start_column, end_line, end_column
             FROM \"references\" WHERE target_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![symbol_id], Self::map_reference_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn outgoing_calls(&self, symbol_id: i64) -> Result<Vec<CallRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT id, caller_id, callee_id, site_file_id, start_line, start_column, end_line, end_column
             FROM calls WHERE caller_id = ?1",
        )?;
        let rows = stmt.query_map(params![symbol_id], Self::map_call_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn incoming_calls(&self, symbol_id: i64) -> Result<Vec<CallRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT id, caller_id, callee_id, site_file_id, start_line, start_column, end_line, end_column
             FROM calls WHERE callee_id = ?1",
        )?;
        let rows = stmt.query_map(params![symbol_id], Self::map_call_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Symbols whose qualified name starts with `prefix.` and is a member
    /// kind (method/property/field), plus — for Go — a heuristic pass over
    /// qualified names containing `Recv.`, `(*Recv).`, or `.Recv.`
    /// (`spec.md` §4.6, §4.2 member kinds).
    pub fn members_of(&self, qualified_prefix: &str, go_receiver_patterns: &[String]) -> Result<Vec<SymbolRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let like_prefix = format!("{qualified_prefix}.%");
        let mut stmt = conn.prepare(
            "SELECT id, file_id, language, kind, name, qualified_name, start_line, start_column, end_line, end_column, signature, exported, chunk_hash, chunk_summary, summary_tokens, summarized_at
             FROM symbols WHERE qualified_name LIKE ?1 AND kind IN ('method', 'property', 'field')",
        )?;
        let mut rows: Vec<SymbolRow> = stmt.query_map(params![like_prefix], Self::map_symbol_row)?.collect::<rusqlite::Result<_>>()?;

        if !go_receiver_patterns.is_empty() {
            let mut stmt = conn.prepare(
                "SELECT id, file_id, language, kind, name, qualified_name, start_line, start_column, end_line, end_column, signature, exported, chunk_hash, chunk_summary, summary_tokens, summarized_at
                 FROM symbols WHERE kind = 'method' AND language = 'go'",
            )?;
            let go_methods: Vec<SymbolRow> = stmt.query_map([], Self::map_symbol_row)?.collect::<rusqlite::Result<_>>()?;
            for method in go_methods {
                if go_receiver_patterns.iter().any(|p| method.qualified_name.contains(p.as_str())) {
                    rows.push(method);
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        rows.retain(|r| seen.insert(r.id));
        Ok(rows)
    }

    pub fn embeddings_for_model(&self, model: &str) -> Result<Vec<EmbeddingRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT id, symbol_id, model, dim, payload, chunk_hash, created_at, updated_at FROM embeddings WHERE model = ?1",
        )?;
        let rows = stmt.query_map(params![model], Self::map_embedding_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn upsert_embedding(&self, symbol_id: i64, model: &str, dim: u32, payload: &[u8], chunk_hash: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO embeddings (symbol_id, model, dim, payload, chunk_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(symbol_id, model) DO UPDATE SET dim = excluded.dim, payload = excluded.payload, chunk_hash = excluded.chunk_hash, updated_at = excluded.updated_at",
            params![symbol_id, model, dim, payload, chunk_hash, now],
        )?;
        Ok(())
    }

    pub fn update_summary(&self, symbol_id: i64, chunk_hash: &str, summary: &str, tokens: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE symbols SET chunk_hash = ?1, chunk_summary = ?2, summary_tokens = ?3, summarized_at = ?4 WHERE id = ?5",
            params![chunk_hash, summary, tokens, now, symbol_id],
        )?;
        Ok(())
    }

    pub fn symbols_needing_summary(&self) -> Result<Vec<SymbolRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT id, file_id, language, kind, name, qualified_name, start_line, start_column, end_line, end_column, signature, exported, chunk_hash, chunk_summary, summary_tokens, summarized_at
             FROM symbols WHERE chunk_summary IS NULL",
        )?;
        let rows = stmt.query_map([], Self::map_symbol_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn symbols_needing_embedding(&self, model: &str) -> Result<Vec<SymbolRow>> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT s.id, s.file_id, s.language, s.kind, s.name, s.qualified_name, s.start_line, s.start_column, s.end_line, s.end_column, s.signature, s.exported, s.chunk_hash, s.chunk_summary, s.summary_tokens, s.summarized_at
             FROM symbols s
             WHERE s.chunk_hash IS NOT NULL
               AND NOT EXISTS (
                   SELECT 1 FROM embeddings e
                   WHERE e.symbol_id = s.id AND e.model = ?1 AND e.chunk_hash = s.chunk_hash
               )",
        )?;
        let rows = stmt.query_map(params![model], Self::map_symbol_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn clear_all(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch("DELETE FROM embeddings; DELETE FROM \"references\"; DELETE FROM calls; DELETE FROM symbols; DELETE FROM files;")?;
        Ok(())
    }

    pub fn compact(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute_batch("VACUUM;")?;
        Ok(())
    }

    fn map_symbol_row(row: &rusqlite::Row) -> rusqlite::Result<SymbolRow> {
        let language: String = row.get(2)?;
        let kind: String = row.get(3)?;
        let summarized_at: Option<String> = row.get(15)?;
        Ok(SymbolRow {
            id: row.get(0)?,
            file_id: row.get(1)?,
            language: LanguageTag::parse(&language).unwrap_or(LanguageTag::Rust),
            kind: SymbolKind::parse(&kind).unwrap_or(SymbolKind::Variable),
            name: row.get(4)?,
            qualified_name: row.get(5)?,
            span: Span {
                start_line: row.get(6)?,
                start_column: row.get(7)?,
                end_line: row.get(8)?,
                end_column: row.get(9)?,
            },
            signature: row.get(10)?,
            exported: row.get::<_, i64>(11)? != 0,
            chunk_hash: row.get(12)?,
            chunk_summary: row.get(13)?,
            summary_tokens: row.get(14)?,
            summarized_at: summarized_at.map(|s| parse_timestamp(&s)),
        })
    }

    fn map_call_row(row: &rusqlite::Row) -> rusqlite::Result<CallRow> {
        Ok(CallRow {
            id: row.get(0)?,
            caller_id: row.get(1)?,
            callee_id: row.get(2)?,
            site_file_id: row.get(3)?,
            span: Span {
                start_line: row.get(4)?,
                start_column: row.get(5)?,
                end_line: row.get(6)?,
                end_column: row.get(7)?,
            },
        })
    }

    fn map_reference_row(row: &rusqlite::Row) -> rusqlite::Result<ReferenceRow> {
        let kind: String = row.get(2)?;
        Ok(ReferenceRow {
            id: row.get(0)?,
            target_id: row.get(1)?,
            kind: ReferenceKind::parse(&kind).unwrap_or(ReferenceKind::Read),
            source_file_id: row.get(3)?,
            span: Span {
                start_line: row.get(4)?,
                start_column: row.get(5)?,
                end_line: row.get(6)?,
                end_column: row.get(7)?,
            },
        })
    }

    fn map_embedding_row(row: &rusqlite::Row) -> rusqlite::Result<EmbeddingRow> {
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;
        Ok(EmbeddingRow {
            id: row.get(0)?,
            symbol_id: row.get(1)?,
            model: row.get(2)?,
            dim: row.get(3)?,
            payload: row.get(4)?,
            chunk_hash: row.get(5)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeindex_core::{ExtractOptions, GrammarRegistry};

    fn extract(source: &str, tag: LanguageTag) -> ExtractionRecord {
        let mut registry = GrammarRegistry::new(&[tag]).unwrap();
        let tree = registry.parse(source, tag).unwrap();
        codeindex_core::extract(source, &tree, tag, &ExtractOptions::default())
    }

    #[test]
    fn reindex_inserts_symbols_and_resolves_call() {
        let store = Store::open_in_memory().unwrap();
        let source = "fn a() { b(); }\nfn b() {}\n";
        let record = extract(source, LanguageTag::Rust);
        let (file_id, stats) = store
            .reindex_file("a.rs", LanguageTag::Rust, "hash1", Utc::now(), source.len() as i64, &record)
            .unwrap();
        assert_eq!(stats.symbols_written, 2);
        assert_eq!(stats.calls_written, 1);

        let found = store.find_symbols("a", None, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_id, file_id);

        let a = &found[0];
        let outgoing = store.outgoing_calls(a.id).unwrap();
        assert_eq!(outgoing.len(), 1);
    }

    #[test]
    fn reindex_same_content_resets_symbol_rows() {
        let store = Store::open_in_memory().unwrap();
        let source = "fn a() {}\n";
        let record = extract(source, LanguageTag::Rust);
        store.reindex_file("a.rs", LanguageTag::Rust, "hash1", Utc::now(), source.len() as i64, &record).unwrap();
        store.reindex_file("a.rs", LanguageTag::Rust, "hash1", Utc::now(), source.len() as i64, &record).unwrap();
        let found = store.find_symbols("a", None, None).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn delete_file_cascades_to_symbols() {
        let store = Store::open_in_memory().unwrap();
        let source = "fn a() {}\n";
        let record = extract(source, LanguageTag::Rust);
        let (file_id, _) = store.reindex_file("a.rs", LanguageTag::Rust, "hash1", Utc::now(), source.len() as i64, &record).unwrap();
        store.delete_file(file_id).unwrap();
        assert!(store.find_symbols("a", None, None).unwrap().is_empty());
    }

    #[test]
    fn delete_directory_removes_prefixed_paths() {
        let store = Store::open_in_memory().unwrap();
        let source = "fn a() {}\n";
        let record = extract(source, LanguageTag::Rust);
        store.reindex_file("src/pkg/a.rs", LanguageTag::Rust, "h", Utc::now(), 1, &record).unwrap();
        store.reindex_file("other/b.rs", LanguageTag::Rust, "h", Utc::now(), 1, &record).unwrap();
        let removed = store.delete_directory("src/pkg").unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_file_by_path("src/pkg/a.rs").unwrap().is_none());
        assert!(store.get_file_by_path("other/b.rs").unwrap().is_some());
    }
}
