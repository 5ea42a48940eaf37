//! Test mocks for the two external-collaborator seams:
//! - MockBackend (SearchBackend) - HashMap-based query/url → hits
//! - MockDecomposer (Decomposer) - HashMap-based query → decomposition
//!
//! Plus helpers for constructing hits and decompositions. Stores need no
//! mocking - boundary tests run against the real MemoryStore.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use seine_common::{
    QueryDecomposition, SearchConfig, SearchContext, SeineError, SubQuery,
};

use crate::traits::{Decomposer, FetchBatch, RawHit, SearchBackend};

// ---------------------------------------------------------------------------
// MockBackend
// ---------------------------------------------------------------------------

/// HashMap-based fetch backend. Returns `Err` for unregistered queries/URLs,
/// which is how tests force a sub-search failure.
/// Builder pattern: `.on_search()`, `.on_scrape()`.
pub struct MockBackend {
    searches: HashMap<String, Vec<RawHit>>,
    scrapes: HashMap<String, RawHit>,
    search_log: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            searches: HashMap::new(),
            scrapes: HashMap::new(),
            search_log: Mutex::new(Vec::new()),
        }
    }

    pub fn on_search(mut self, query: &str, hits: Vec<RawHit>) -> Self {
        self.searches.insert(query.to_string(), hits);
        self
    }

    pub fn on_scrape(mut self, url: &str, hit: RawHit) -> Self {
        self.scrapes.insert(url.to_string(), hit);
        self
    }

    /// Queries actually sent to the backend, in call order.
    pub fn search_log(&self) -> Vec<String> {
        self.search_log.lock().unwrap().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn search(&self, query: &str, _config: &SearchConfig) -> Result<FetchBatch, SeineError> {
        self.search_log.lock().unwrap().push(query.to_string());
        match self.searches.get(query) {
            Some(hits) => Ok(FetchBatch {
                hits: hits.clone(),
                credits_used: 1,
            }),
            None => Err(SeineError::Backend(format!(
                "no search registered for query: {query}"
            ))),
        }
    }

    async fn scrape(&self, url: &str) -> Result<FetchBatch, SeineError> {
        match self.scrapes.get(url) {
            Some(hit) => Ok(FetchBatch {
                hits: vec![hit.clone()],
                credits_used: 1,
            }),
            None => Err(SeineError::Backend(format!(
                "no scrape registered for url: {url}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockDecomposer
// ---------------------------------------------------------------------------

/// HashMap-based decomposer with a call counter, so tests can prove the
/// cache short-circuited the LLM.
pub struct MockDecomposer {
    responses: HashMap<String, QueryDecomposition>,
    calls: Mutex<u32>,
}

impl MockDecomposer {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(0),
        }
    }

    pub fn on_query(mut self, query: &str, decomposition: QueryDecomposition) -> Self {
        self.responses.insert(query.to_string(), decomposition);
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl Default for MockDecomposer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Decomposer for MockDecomposer {
    async fn decompose(
        &self,
        query: &str,
        _context: &SearchContext,
    ) -> Result<QueryDecomposition, SeineError> {
        *self.calls.lock().unwrap() += 1;
        self.responses
            .get(query)
            .cloned()
            .ok_or_else(|| SeineError::Backend(format!("no decomposition registered for: {query}")))
    }
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

pub fn hit(title: &str, url: &str, markdown: &str) -> RawHit {
    RawHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: None,
        markdown: Some(markdown.to_string()),
        html: None,
        relevance_score: 0.5,
        metadata: serde_json::Value::Null,
    }
}

pub fn hit_with_score(title: &str, url: &str, markdown: &str, relevance_score: f64) -> RawHit {
    RawHit {
        relevance_score,
        ..hit(title, url, markdown)
    }
}

pub fn decomposition_of(queries: &[&str]) -> QueryDecomposition {
    QueryDecomposition {
        sub_queries: queries
            .iter()
            .map(|q| SubQuery {
                query: q.to_string(),
                reasoning: format!("covers {q}"),
                focus: "general".to_string(),
            })
            .collect(),
        overall_strategy: "split by aspect".to_string(),
        model: "mock".to_string(),
        tokens_used: 42,
    }
}
