//! Multi-query orchestration: decompose via LLM (cache-fronted), let the
//! caller confirm or edit the sub-queries, fan out bounded-concurrency
//! sub-searches, aggregate.
//!
//! Once `searching` begins every confirmed sub-query runs to completion -
//! there is no mid-run cancellation. Sub-search failures are captured per
//! query and reflected in the final status, never propagated to siblings.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use seine_common::{
    AggregatedResult, AggregationStats, ExecutionStatus, OrchestrationStatus, OrchestrationTask,
    SearchConfig, SearchContext, SearchTask, SeineError, SubSearchOutcome, UserModifications,
};

use crate::aggregate::ResultAggregator;
use crate::decompose::DecompositionService;
use crate::executor::{SearchExecutionCoordinator, SearchRequest};
use crate::store::{MappedResult, OrchestrationStore};

pub const DEFAULT_MAX_CONCURRENT_SEARCHES: usize = 5;

const ORCHESTRATOR_ACTOR: &str = "aggregation_orchestrator";

#[derive(Debug, Clone)]
pub struct DecomposeRequest {
    pub name: String,
    pub query: String,
    pub config: SearchConfig,
    pub created_by: String,
}

/// How to view an orchestration task's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Cross-query deduplicated ranking.
    Combined,
    /// Per-sub-query grouping, original rank order.
    ByQuery,
}

#[derive(Debug, Clone)]
pub struct QueryGroup {
    pub query: String,
    pub task_id: Uuid,
    pub status: ExecutionStatus,
    pub total: u64,
    pub credits_used: i64,
    pub execution_time_ms: i64,
    pub results: Vec<MappedResult>,
}

#[derive(Debug, Clone)]
pub enum AggregatedView {
    Combined {
        stats: Option<AggregationStats>,
        results: Vec<AggregatedResult>,
        total: u64,
    },
    ByQuery {
        groups: Vec<QueryGroup>,
    },
}

pub struct AggregationOrchestrator {
    store: Arc<dyn OrchestrationStore>,
    coordinator: Arc<SearchExecutionCoordinator>,
    decomposition: DecompositionService,
    aggregator: ResultAggregator,
    max_concurrent: usize,
}

impl AggregationOrchestrator {
    pub fn new(
        store: Arc<dyn OrchestrationStore>,
        coordinator: Arc<SearchExecutionCoordinator>,
        decomposition: DecompositionService,
        aggregator: ResultAggregator,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            coordinator,
            decomposition,
            aggregator,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Stage 1: create the task and decompose the query. The task ends in
    /// `awaiting_confirmation` on success, `failed` on LLM failure.
    pub async fn decompose_query(
        &self,
        request: DecomposeRequest,
    ) -> Result<OrchestrationTask, SeineError> {
        let mut task = OrchestrationTask::new(
            request.name,
            request.query.clone(),
            request.config,
            request.created_by,
        );
        self.store.insert(&task).await?;

        let context = SearchContext::from(&task.config);
        match self.decomposition.decompose(&request.query, &context).await {
            Ok(decomposition) => {
                task.set_decomposition(&decomposition);
                self.store.update(&task).await?;
                info!(
                    task = %task.id,
                    sub_queries = task.sub_queries.len(),
                    "Query decomposed, awaiting confirmation"
                );
                Ok(task)
            }
            Err(e) => {
                task.mark_failed(format!("query decomposition failed: {e}"));
                self.store.update(&task).await?;
                Err(e)
            }
        }
    }

    /// Stage 2: run the confirmed sub-queries and aggregate.
    pub async fn confirm_and_execute(
        &self,
        task_id: Uuid,
        confirmed_queries: Vec<String>,
    ) -> Result<OrchestrationTask, SeineError> {
        let started = Instant::now();

        let mut task = self.get_required(task_id).await?;
        if task.status != OrchestrationStatus::AwaitingConfirmation {
            return Err(SeineError::InvalidState {
                expected: OrchestrationStatus::AwaitingConfirmation.to_string(),
                actual: task.status.to_string(),
            });
        }
        if confirmed_queries.is_empty() {
            return Err(SeineError::ConfigValidation(
                "at least one confirmed query is required".to_string(),
            ));
        }

        task.user_modifications = Some(diff_queries(&task.sub_queries, &confirmed_queries));
        task.confirmed_queries = confirmed_queries.clone();
        task.confirmed_at = Some(Utc::now());
        task.mark_searching();
        self.store.update(&task).await?;

        info!(
            task = %task.id,
            queries = confirmed_queries.len(),
            max_concurrent = self.max_concurrent,
            "Running confirmed sub-searches"
        );

        let sub_tasks = self.run_sub_searches(&task, &confirmed_queries).await;

        task.sub_task_ids = sub_tasks.iter().map(|t| t.id).collect();
        task.sub_search_outcomes = sub_tasks.iter().map(outcome_of).collect();

        let aggregation = match self.aggregator.aggregate(task.id, &sub_tasks).await {
            Ok(aggregation) => aggregation,
            Err(e) => {
                task.mark_failed(format!("aggregation failed: {e}"));
                self.store.update(&task).await?;
                return Err(e);
            }
        };

        task.execution_time_ms = started.elapsed().as_millis() as i64;

        let stats = aggregation.stats;
        if stats.failed_searches == 0 {
            task.mark_completed(stats);
        } else if stats.successful_searches > 0 {
            task.mark_partial_success(stats);
        } else {
            task.stats = Some(stats);
            task.mark_failed("all sub-searches failed");
        }
        self.store.update(&task).await?;

        info!(task = %task.id, status = %task.status, "Orchestration finished");
        Ok(task)
    }

    /// Fan the confirmed queries out through the execution coordinator,
    /// bounded by the concurrency gate. A failed sub-search becomes a failed
    /// task record; it never aborts its siblings.
    async fn run_sub_searches(
        &self,
        task: &OrchestrationTask,
        queries: &[String],
    ) -> Vec<SearchTask> {
        let mut indexed: Vec<(usize, SearchTask)> =
            stream::iter(queries.iter().cloned().enumerate().map(|(idx, query)| {
                let coordinator = self.coordinator.clone();
                let config = task.config.clone();
                async move {
                    let request = SearchRequest {
                        name: format!("sub-search: {query}"),
                        query: Some(query.clone()),
                        crawl_url: None,
                        config,
                        created_by: ORCHESTRATOR_ACTOR.to_string(),
                    };
                    let sub_task = match coordinator.execute(request).await {
                        Ok(sub_task) => sub_task,
                        Err(e) => {
                            warn!(query = %query, error = %e, "Sub-search could not run");
                            let mut failed = SearchTask::new(
                                format!("sub-search: {query}"),
                                Some(query),
                                None,
                                SearchConfig::default(),
                                ORCHESTRATOR_ACTOR,
                            );
                            failed.mark_failed(e.to_string());
                            failed
                        }
                    };
                    (idx, sub_task)
                }
            }))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        indexed.sort_by_key(|(idx, _)| *idx);
        indexed.into_iter().map(|(_, t)| t).collect()
    }

    /// Fetch the results of a finished orchestration in the requested view.
    pub async fn get_aggregated_results(
        &self,
        task_id: Uuid,
        view: ViewMode,
        page: u32,
        page_size: u32,
    ) -> Result<AggregatedView, SeineError> {
        let task = self.get_required(task_id).await?;
        if !matches!(
            task.status,
            OrchestrationStatus::Completed | OrchestrationStatus::PartialSuccess
        ) {
            return Err(SeineError::InvalidState {
                expected: "completed or partial_success".to_string(),
                actual: task.status.to_string(),
            });
        }

        match view {
            ViewMode::Combined => {
                let (results, total) = self.aggregator.combined_view(task.id, page, page_size).await?;
                Ok(AggregatedView::Combined {
                    stats: task.stats,
                    results,
                    total,
                })
            }
            ViewMode::ByQuery => {
                let mut groups = Vec::with_capacity(task.sub_task_ids.len());
                for sub_task_id in &task.sub_task_ids {
                    let Some(sub_task) = self.coordinator.get_task(*sub_task_id).await? else {
                        continue;
                    };
                    let (results, total) = if sub_task.status == ExecutionStatus::Completed {
                        self.coordinator
                            .task_results(sub_task.id, page, page_size)
                            .await?
                    } else {
                        (Vec::new(), 0)
                    };
                    groups.push(QueryGroup {
                        query: sub_task
                            .query
                            .clone()
                            .or_else(|| sub_task.crawl_url.clone())
                            .unwrap_or_default(),
                        task_id: sub_task.id,
                        status: sub_task.status,
                        total,
                        credits_used: sub_task.credits_used,
                        execution_time_ms: sub_task.execution_time_ms,
                        results,
                    });
                }
                Ok(AggregatedView::ByQuery { groups })
            }
        }
    }

    /// Expire a task whose confirmation window elapsed. Only valid from
    /// `awaiting_confirmation`; the 24h timer lives outside this core.
    pub async fn mark_expired(&self, task_id: Uuid) -> Result<OrchestrationTask, SeineError> {
        let mut task = self.get_required(task_id).await?;
        if task.status != OrchestrationStatus::AwaitingConfirmation {
            return Err(SeineError::InvalidState {
                expected: OrchestrationStatus::AwaitingConfirmation.to_string(),
                actual: task.status.to_string(),
            });
        }
        task.mark_expired();
        self.store.update(&task).await?;
        Ok(task)
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<OrchestrationTask>, SeineError> {
        Ok(self.store.get(task_id).await?)
    }

    async fn get_required(&self, task_id: Uuid) -> Result<OrchestrationTask, SeineError> {
        self.store
            .get(task_id)
            .await?
            .ok_or(SeineError::NotFound {
                entity: "orchestration task",
                id: task_id.to_string(),
            })
    }
}

/// What the user changed relative to the decomposition. Set difference in
/// both directions; order of `added` follows the confirmed list.
fn diff_queries(
    sub_queries: &[seine_common::SubQuery],
    confirmed: &[String],
) -> UserModifications {
    let original: HashSet<&str> = sub_queries.iter().map(|q| q.query.as_str()).collect();
    let kept: HashSet<&str> = confirmed.iter().map(String::as_str).collect();

    UserModifications {
        added: confirmed
            .iter()
            .filter(|q| !original.contains(q.as_str()))
            .cloned()
            .collect(),
        removed: sub_queries
            .iter()
            .filter(|q| !kept.contains(q.query.as_str()))
            .map(|q| q.query.clone())
            .collect(),
    }
}

fn outcome_of(sub_task: &SearchTask) -> SubSearchOutcome {
    SubSearchOutcome {
        query: sub_task
            .query
            .clone()
            .or_else(|| sub_task.crawl_url.clone())
            .unwrap_or_default(),
        task_id: sub_task.id,
        status: sub_task.status,
        result_count: sub_task.total_results,
        credits_used: sub_task.credits_used,
        execution_time_ms: sub_task.execution_time_ms,
        error: sub_task.error_message.clone(),
        retryable: sub_task.status == ExecutionStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seine_common::SubQuery;

    fn sub_queries(queries: &[&str]) -> Vec<SubQuery> {
        queries
            .iter()
            .map(|q| SubQuery {
                query: q.to_string(),
                reasoning: String::new(),
                focus: String::new(),
            })
            .collect()
    }

    #[test]
    fn diff_detects_added_and_removed() {
        let original = sub_queries(&["a", "b", "c"]);
        let confirmed = vec!["b".to_string(), "d".to_string()];
        let diff = diff_queries(&original, &confirmed);
        assert_eq!(diff.added, vec!["d".to_string()]);
        assert_eq!(diff.removed, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn diff_is_empty_when_confirmed_as_is() {
        let original = sub_queries(&["a", "b"]);
        let confirmed = vec!["a".to_string(), "b".to_string()];
        let diff = diff_queries(&original, &confirmed);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
    }
}
