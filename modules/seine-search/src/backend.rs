//! Production implementations of the external-collaborator seams.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use firecrawl_client::{FirecrawlClient, SearchOptions};
use llm_client::{DecompositionContext, LlmClient};
use seine_common::{
    QueryDecomposition, SearchConfig, SearchContext, SeineError, SubQuery,
};

use crate::traits::{Decomposer, FetchBatch, RawHit, SearchBackend};

/// Firecrawl-backed fetch. Every call is wrapped in an explicit timeout so a
/// hung request surfaces as a sub-search failure, not a stuck orchestration.
pub struct FirecrawlBackend {
    client: FirecrawlClient,
    fetch_timeout: Duration,
}

impl FirecrawlBackend {
    pub fn new(client: FirecrawlClient, fetch_timeout: Duration) -> Self {
        Self {
            client,
            fetch_timeout,
        }
    }
}

#[async_trait]
impl SearchBackend for FirecrawlBackend {
    async fn search(&self, query: &str, config: &SearchConfig) -> Result<FetchBatch, SeineError> {
        let options = SearchOptions {
            limit: config.limit,
            lang: config.language.clone(),
            include_domains: config.include_domains.clone(),
            exclude_domains: config.exclude_domains.clone(),
            time_range: config.time_range.clone(),
        };

        let batch = tokio::time::timeout(self.fetch_timeout, self.client.search(query, &options))
            .await
            .map_err(|_| SeineError::Backend(format!("search timed out: {query}")))?
            .map_err(|e| SeineError::Backend(e.to_string()))?;

        let hits = batch
            .hits
            .into_iter()
            .map(|hit| RawHit {
                title: hit.title,
                url: hit.url,
                snippet: hit.description,
                markdown: hit.markdown,
                html: hit.html,
                relevance_score: hit.score.unwrap_or(0.0),
                metadata: hit.metadata.unwrap_or(serde_json::Value::Null),
            })
            .collect();

        Ok(FetchBatch {
            hits,
            credits_used: i64::from(batch.credits_used),
        })
    }

    async fn scrape(&self, url: &str) -> Result<FetchBatch, SeineError> {
        let page = tokio::time::timeout(self.fetch_timeout, self.client.scrape(url))
            .await
            .map_err(|_| SeineError::Backend(format!("scrape timed out: {url}")))?
            .map_err(|e| SeineError::Backend(e.to_string()))?;

        let hit = RawHit {
            title: page.title,
            url: page.url,
            snippet: None,
            markdown: page.markdown,
            html: page.html,
            relevance_score: 0.0,
            metadata: page.metadata,
        };

        Ok(FetchBatch {
            hits: vec![hit],
            credits_used: 1,
        })
    }
}

/// LLM-backed query decomposition.
pub struct LlmDecomposer {
    client: LlmClient,
}

impl LlmDecomposer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Decomposer for LlmDecomposer {
    async fn decompose(
        &self,
        query: &str,
        context: &SearchContext,
    ) -> Result<QueryDecomposition, SeineError> {
        let wire_context = DecompositionContext {
            target_domains: context.target_domains.clone(),
            language: context.language.clone(),
            time_range: context.time_range.clone(),
        };

        let decomposition = self
            .client
            .decompose(query, &wire_context)
            .await
            .map_err(|e| {
                warn!(query, error = %e, "Query decomposition failed");
                SeineError::Backend(e.to_string())
            })?;

        Ok(QueryDecomposition {
            sub_queries: decomposition
                .decomposed_queries
                .into_iter()
                .map(|q| SubQuery {
                    query: q.query,
                    reasoning: q.reasoning,
                    focus: q.focus,
                })
                .collect(),
            overall_strategy: decomposition.overall_strategy,
            model: decomposition.model,
            tokens_used: i64::from(decomposition.tokens_used),
        })
    }
}
