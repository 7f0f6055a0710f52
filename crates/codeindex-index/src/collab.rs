//! External collaborators — summarizer & embedding generator (`spec.md`
//! §4.8, §5, §7).
//!
//! The core only issues the fan-out; it never implements summarization or
//! embedding itself. `HttpSummarizer`/`HttpEmbeddingGenerator` are thin
//! `reqwest` clients grounded on `rag-store`'s `embed_pool` concurrency
//! shape and `greppy`'s per-request timeout/error style. `run_batch` bounds
//! in-flight requests via `futures::stream::buffer_unordered` and retries
//! each failure with exponential backoff before giving up on that symbol.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::SymbolRow;

const DEFAULT_CONCURRENCY: usize = 5;
const DEFAULT_MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("collaborator returned an error response: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, CollabError>;

/// A freshly generated summary for one symbol, ready for
/// `Store::update_summary`.
#[derive(Debug, Clone)]
pub struct SummaryUpdate {
    pub chunk_hash: String,
    pub summary: String,
    pub tokens: i64,
}

/// A freshly generated embedding for one symbol, ready for
/// `Store::upsert_embedding`.
#[derive(Debug, Clone)]
pub struct EmbeddingUpdate {
    pub chunk_hash: String,
    pub dim: u32,
    pub vector: Vec<f32>,
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, symbol: &SymbolRow, code: &str) -> Result<SummaryUpdate>;
}

#[async_trait::async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    async fn embed(&self, symbol: &SymbolRow, code: &str, model: &str) -> Result<EmbeddingUpdate>;
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    qualified_name: &'a str,
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    summary: String,
    tokens: i64,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    qualified_name: &'a str,
    code: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    vector: Vec<f32>,
}

fn chunk_hash(code: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Default HTTP-backed summarizer, posting JSON to a configured base URL.
pub struct HttpSummarizer {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSummarizer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }
}

#[async_trait::async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, symbol: &SymbolRow, code: &str) -> Result<SummaryUpdate> {
        let url = format!("{}/summarize", self.base_url);
        let request = SummarizeRequest { qualified_name: &symbol.qualified_name, code };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(CollabError::Api(format!("HTTP {}", response.status())));
        }
        let body: SummarizeResponse = response.json().await?;
        Ok(SummaryUpdate { chunk_hash: chunk_hash(code), summary: body.summary, tokens: body.tokens })
    }
}

/// Default HTTP-backed embedding generator, posting JSON to a configured
/// base URL.
pub struct HttpEmbeddingGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEmbeddingGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
    }
}

#[async_trait::async_trait]
impl EmbeddingGenerator for HttpEmbeddingGenerator {
    async fn embed(&self, symbol: &SymbolRow, code: &str, model: &str) -> Result<EmbeddingUpdate> {
        let url = format!("{}/embed", self.base_url);
        let request = EmbedRequest { qualified_name: &symbol.qualified_name, code, model };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(CollabError::Api(format!("HTTP {}", response.status())));
        }
        let body: EmbedResponse = response.json().await?;
        Ok(EmbeddingUpdate { chunk_hash: chunk_hash(code), dim: body.vector.len() as u32, vector: body.vector })
    }
}

/// Outcome of one symbol's attempt, successful or exhausted.
pub enum BatchOutcome<T> {
    Ok { symbol_id: i64, update: T },
    Failed { symbol_id: i64, error: String },
}

/// Run one async `unit_of_work` per `(symbol, code)` pair, bounded to
/// `concurrency` in flight at a time, retrying transient failures with
/// `attempt * 1s` backoff up to `max_retries` (`spec.md` §4.8/§7). Failures
/// are reported per-symbol rather than aborting the whole batch.
pub async fn run_batch<T, F, Fut>(
    items: Vec<(SymbolRow, String)>,
    concurrency: Option<usize>,
    max_retries: Option<u32>,
    unit_of_work: F,
) -> Vec<BatchOutcome<T>>
where
    F: Fn(SymbolRow, String) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<T>> + Send,
    T: Send + 'static,
{
    let concurrency = concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1);
    let max_retries = max_retries.unwrap_or(DEFAULT_MAX_RETRIES);

    stream::iter(items.into_iter())
        .map(move |(symbol, code)| {
            let unit_of_work = unit_of_work.clone();
            async move {
                let symbol_id = symbol.id;
                let mut attempt = 0u32;
                loop {
                    match unit_of_work(symbol.clone(), code.clone()).await {
                        Ok(update) => return BatchOutcome::Ok { symbol_id, update },
                        Err(err) if attempt < max_retries => {
                            attempt += 1;
                            debug!(symbol_id, attempt, error = %err, "collaborator call failed, retrying");
                            tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                        }
                        Err(err) => {
                            warn!(symbol_id, error = %err, "collaborator call exhausted retries");
                            return BatchOutcome::Failed { symbol_id, error: err.to_string() };
                        }
                    }
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeindex_core::{LanguageTag, SymbolKind};

    fn sample_symbol(id: i64) -> SymbolRow {
        SymbolRow {
            id,
            file_id: 1,
            language: LanguageTag::Rust,
            kind: SymbolKind::Function,
            name: "f".to_string(),
            qualified_name: "f".to_string(),
            span: codeindex_core::Span { start_line: 1, start_column: 0, end_line: 1, end_column: 1 },
            signature: None,
            exported: true,
            chunk_hash: None,
            chunk_summary: None,
            summary_tokens: None,
            summarized_at: None,
        }
    }

    #[tokio::test]
    async fn run_batch_succeeds_without_retry() {
        let items = vec![(sample_symbol(1), "fn f() {}".to_string())];
        let results = run_batch(items, Some(2), Some(1), |_symbol, _code| async move { Ok(42u32) }).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], BatchOutcome::Ok { symbol_id: 1, update: 42 }));
    }

    #[tokio::test]
    async fn run_batch_reports_failure_after_exhausting_retries() {
        let items = vec![(sample_symbol(2), "fn g() {}".to_string())];
        let results = run_batch(items, Some(2), Some(0), |_symbol, _code| async move {
            Err::<u32, _>(CollabError::Api("boom".to_string()))
        })
        .await;
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], BatchOutcome::Failed { symbol_id: 2, .. }));
    }
}
