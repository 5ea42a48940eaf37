//! Trait seams for the external collaborators: the fetch backend and the
//! LLM decomposition call.
//!
//! These enable deterministic testing with in-memory mocks - no network,
//! no database, no Docker.

use async_trait::async_trait;

use seine_common::{QueryDecomposition, SearchConfig, SearchContext, SeineError};

/// One raw hit from the fetch backend, in backend rank order.
#[derive(Debug, Clone)]
pub struct RawHit {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub relevance_score: f64,
    pub metadata: serde_json::Value,
}

/// A batch of raw hits plus what the call cost.
#[derive(Debug, Clone)]
pub struct FetchBatch {
    pub hits: Vec<RawHit>,
    pub credits_used: i64,
}

/// The external crawling/search backend, reduced to the two calls the
/// execution coordinator needs.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Keyword search returning scraped page content per hit.
    async fn search(&self, query: &str, config: &SearchConfig) -> Result<FetchBatch, SeineError>;

    /// Scrape a single URL. The batch holds exactly one hit on success.
    async fn scrape(&self, url: &str) -> Result<FetchBatch, SeineError>;
}

/// The LLM decomposition call behind a seam.
#[async_trait]
pub trait Decomposer: Send + Sync {
    async fn decompose(
        &self,
        query: &str,
        context: &SearchContext,
    ) -> Result<QueryDecomposition, SeineError>;
}
