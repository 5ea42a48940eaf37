//! One search/crawl execution: fetch, dedup, map, account.
//!
//! Hits are processed sequentially in backend rank order so search_position
//! assignment stays deterministic. Across concurrent executions the store
//! primitives (atomic increment, unique-constrained insert) make the
//! first-discovery race safe - see `ingest_hits`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use seine_common::{
    DiscoveryMapping, ExecutionStatus, FetchedResult, ResultStatus, SearchConfig, SearchMode,
    SearchTask, SeineError, StoreError,
};

use crate::fingerprint::{fingerprint, normalize_url};
use crate::store::{MappedResult, MappingStore, ResultStore, TaskStore};
use crate::traits::{RawHit, SearchBackend};

/// Request for one search/crawl execution. URL mode takes priority when both
/// a query and a URL are given; neither is a configuration error.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub name: String,
    pub query: Option<String>,
    pub crawl_url: Option<String>,
    pub config: SearchConfig,
    pub created_by: String,
}

struct RunOutcome {
    new_count: i64,
    shared_count: i64,
    credits_used: i64,
}

pub struct SearchExecutionCoordinator {
    tasks: Arc<dyn TaskStore>,
    results: Arc<dyn ResultStore>,
    mappings: Arc<dyn MappingStore>,
    backend: Arc<dyn SearchBackend>,
}

impl SearchExecutionCoordinator {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        results: Arc<dyn ResultStore>,
        mappings: Arc<dyn MappingStore>,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            tasks,
            results,
            mappings,
            backend,
        }
    }

    /// Create and run one execution.
    ///
    /// Failures during the fetch/dedup phase are captured on the returned
    /// task (`Failed` status, error message set) rather than propagated - a
    /// failed fetch is a failed execution, not a caller error. `Err` is
    /// reserved for validation failures and task-bookkeeping store errors.
    pub async fn execute(&self, request: SearchRequest) -> Result<SearchTask, SeineError> {
        let started = Instant::now();

        let mut task = SearchTask::new(
            request.name,
            request.query,
            request.crawl_url,
            request.config,
            request.created_by,
        );

        let Some(mode) = task.search_mode() else {
            return Err(SeineError::ConfigValidation(
                "either query or crawl_url is required".to_string(),
            ));
        };

        self.tasks.insert(&task).await?;
        task.mark_running();
        self.tasks.update(&task).await?;
        info!(task = %task.id, name = %task.name, "Search execution started");

        match self.run(&task, mode).await {
            Ok(outcome) => {
                let total = outcome.new_count + outcome.shared_count;
                task.mark_completed(
                    total,
                    outcome.new_count,
                    outcome.shared_count,
                    outcome.credits_used,
                    started.elapsed().as_millis() as i64,
                );
                info!(
                    task = %task.id,
                    total,
                    new = outcome.new_count,
                    shared = outcome.shared_count,
                    "Search execution complete"
                );
            }
            Err(e) => {
                task.mark_failed(e.to_string());
                warn!(task = %task.id, error = %e, "Search execution failed");
            }
        }

        self.tasks.update(&task).await?;
        Ok(task)
    }

    async fn run(&self, task: &SearchTask, mode: SearchMode) -> Result<RunOutcome, SeineError> {
        let batch = match mode {
            SearchMode::Crawl => {
                let url = task.crawl_url.as_deref().unwrap_or_default();
                self.backend.scrape(url).await?
            }
            SearchMode::Search => {
                let query = task.query.as_deref().unwrap_or_default();
                self.backend.search(query, &task.config).await?
            }
        };

        let credits_used = batch.credits_used;
        let (new_count, shared_count, mappings) = self.ingest_hits(task, batch.hits).await?;

        if !mappings.is_empty() {
            self.mappings.batch_create(&mappings).await?;
        }

        Ok(RunOutcome {
            new_count,
            shared_count,
            credits_used,
        })
    }

    /// Dedup each hit in rank order: fingerprint miss creates a new result,
    /// a hit bumps the existing result's discovery stats. Either way one
    /// mapping row is queued for this (execution, result) pair.
    async fn ingest_hits(
        &self,
        task: &SearchTask,
        hits: Vec<RawHit>,
    ) -> Result<(i64, i64, Vec<DiscoveryMapping>), SeineError> {
        let mut new_count = 0;
        let mut shared_count = 0;
        let mut mappings = Vec::with_capacity(hits.len());

        for (idx, hit) in hits.into_iter().enumerate() {
            let position = (idx + 1) as i32;
            let fp = fingerprint(
                &hit.title,
                &hit.url,
                hit.markdown.as_deref().unwrap_or_default(),
            );

            let (result_id, is_first_discovery) =
                match self.results.find_by_fingerprint(&fp).await? {
                    Some(existing) => {
                        debug!(fingerprint = %fp, "Dedup hit, sharing existing result");
                        self.results.increment_discovery_stats(existing.id).await?;
                        shared_count += 1;
                        (existing.id, false)
                    }
                    None => {
                        let result = result_from_hit(task.id, &hit, fp.clone());
                        match self.results.create(&result).await {
                            Ok(()) => {
                                new_count += 1;
                                (result.id, true)
                            }
                            // A sibling execution created the same fingerprint
                            // between our lookup and insert. Fall back to the
                            // shared branch - the race is expected, not fatal.
                            Err(StoreError::DuplicateKey(_)) => {
                                let existing = self
                                    .results
                                    .find_by_fingerprint(&fp)
                                    .await?
                                    .ok_or_else(|| {
                                        StoreError::Database(format!(
                                            "fingerprint {fp} vanished after duplicate insert"
                                        ))
                                    })?;
                                self.results.increment_discovery_stats(existing.id).await?;
                                shared_count += 1;
                                (existing.id, false)
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                };

            mappings.push(DiscoveryMapping::new(
                task.search_execution_id,
                result_id,
                task.id,
                position,
                hit.relevance_score,
                is_first_discovery,
            ));
        }

        Ok((new_count, shared_count, mappings))
    }

    /// Page through one execution's results in original rank order.
    pub async fn task_results(
        &self,
        task_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<MappedResult>, u64), SeineError> {
        let task = self
            .tasks
            .get(task_id)
            .await?
            .ok_or(SeineError::NotFound {
                entity: "search task",
                id: task_id.to_string(),
            })?;
        Ok(self
            .mappings
            .results_by_execution(task.search_execution_id, page, page_size)
            .await?)
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<SearchTask>, SeineError> {
        Ok(self.tasks.get(task_id).await?)
    }

    pub async fn list_tasks(
        &self,
        page: u32,
        page_size: u32,
        status: Option<ExecutionStatus>,
    ) -> Result<(Vec<SearchTask>, u64), SeineError> {
        Ok(self.tasks.list(page, page_size, status).await?)
    }

    /// A result's discovery history, newest first - which executions found
    /// it, at what rank.
    pub async fn result_history(
        &self,
        result_id: Uuid,
    ) -> Result<Vec<DiscoveryMapping>, SeineError> {
        Ok(self.mappings.mappings_by_result(result_id).await?)
    }
}

fn result_from_hit(task_id: Uuid, hit: &RawHit, fp: String) -> FetchedResult {
    let now = chrono::Utc::now();
    let snippet = hit
        .snippet
        .clone()
        .or_else(|| hit.markdown.as_ref().map(|m| m.chars().take(200).collect()));

    FetchedResult {
        id: Uuid::now_v7(),
        task_id,
        title: hit.title.clone(),
        url: hit.url.clone(),
        url_normalized: normalize_url(&hit.url),
        snippet,
        markdown_content: hit.markdown.clone(),
        html_content: hit.html.clone(),
        content_fingerprint: fp,
        source: "web".to_string(),
        relevance_score: hit.relevance_score,
        metadata: hit.metadata.clone(),
        status: ResultStatus::Pending,
        first_found_at: now,
        last_found_at: now,
        found_count: 1,
        unique_search_count: 1,
        created_at: now,
        updated_at: now,
    }
}
