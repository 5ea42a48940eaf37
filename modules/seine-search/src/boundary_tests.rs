//! Boundary tests - one seam at a time, MOCK → FUNCTION → OUTPUT.
//!
//! Mocks cover the two external collaborators (fetch backend, decomposer);
//! everything else runs against the real in-memory store.

use std::sync::Arc;

use uuid::Uuid;

use seine_common::{
    DataSourceStatus, ExecutionStatus, FetchedResult, OrchestrationStatus, RawDataKind,
    ResultStatus, SearchConfig, SeineError,
};

use crate::aggregate::ResultAggregator;
use crate::curation::CurationWorkflow;
use crate::decompose::{DecompositionService, QueryDecompositionCache};
use crate::executor::{SearchExecutionCoordinator, SearchRequest};
use crate::fingerprint::{fingerprint, normalize_url};
use crate::orchestrator::{
    AggregatedView, AggregationOrchestrator, DecomposeRequest, ViewMode,
};
use crate::store::{MappingStore, MemoryStore, ResultStore};
use crate::testing::*;

use seine_common::DiscoveryMapping as Mapping;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn coordinator(
    store: &Arc<MemoryStore>,
    backend: Arc<MockBackend>,
) -> Arc<SearchExecutionCoordinator> {
    Arc::new(SearchExecutionCoordinator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        backend,
    ))
}

fn orchestrator(
    backend: MockBackend,
    decomposer: MockDecomposer,
) -> (
    Arc<MemoryStore>,
    Arc<MockDecomposer>,
    AggregationOrchestrator,
) {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(backend);
    let decomposer = Arc::new(decomposer);

    let coordinator = coordinator(&store, backend);
    let cache = QueryDecompositionCache::new(store.clone(), 24);
    let decomposition = DecompositionService::new(decomposer.clone(), cache);
    let aggregator = ResultAggregator::new(store.clone(), store.clone());
    let orchestrator = AggregationOrchestrator::new(
        store.clone(),
        coordinator,
        decomposition,
        aggregator,
        5,
    );
    (store, decomposer, orchestrator)
}

fn curation(store: &Arc<MemoryStore>) -> CurationWorkflow {
    CurationWorkflow::new(store.clone(), store.clone())
}

fn search_request(query: &str) -> SearchRequest {
    SearchRequest {
        name: format!("search: {query}"),
        query: Some(query.to_string()),
        crawl_url: None,
        config: SearchConfig::default(),
        created_by: "tester".to_string(),
    }
}

fn make_result(title: &str, url: &str, markdown: &str) -> FetchedResult {
    let now = chrono::Utc::now();
    FetchedResult {
        id: Uuid::now_v7(),
        task_id: Uuid::now_v7(),
        title: title.to_string(),
        url: url.to_string(),
        url_normalized: normalize_url(url),
        snippet: None,
        markdown_content: Some(markdown.to_string()),
        html_content: None,
        content_fingerprint: fingerprint(title, url, markdown),
        source: "web".to_string(),
        relevance_score: 0.5,
        metadata: serde_json::Value::Null,
        status: ResultStatus::Pending,
        first_found_at: now,
        last_found_at: now,
        found_count: 1,
        unique_search_count: 1,
        created_at: now,
        updated_at: now,
    }
}

async fn seed_result(store: &Arc<MemoryStore>, title: &str) -> FetchedResult {
    let result = make_result(title, &format!("https://example.com/{title}"), "# body");
    ResultStore::create(store.as_ref(), &result).await.unwrap();
    result
}

async fn result_status(store: &Arc<MemoryStore>, id: Uuid) -> ResultStatus {
    ResultStore::get(store.as_ref(), id)
        .await
        .unwrap()
        .unwrap()
        .status
}

// ---------------------------------------------------------------------------
// Executor: dedup across executions
//
// Two identical runs share one FetchedResult with bumped stats and two
// mapping rows, one per execution.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_identical_run_shares_all_results() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(MockBackend::new().on_search(
        "python fastapi tutorial",
        vec![
            hit("FastAPI docs", "https://fastapi.tiangolo.com", "# FastAPI"),
            hit("RealPython guide", "https://realpython.com/fastapi", "# Guide"),
            hit("Tutorial video", "https://example.com/video", "# Video"),
        ],
    ));
    let coordinator = coordinator(&store, backend);

    let first = coordinator
        .execute(search_request("python fastapi tutorial"))
        .await
        .unwrap();
    assert_eq!(first.status, ExecutionStatus::Completed);
    assert_eq!(first.total_results, 3);
    assert_eq!(first.new_results, 3);
    assert_eq!(first.shared_results, 0);

    let second = coordinator
        .execute(search_request("python fastapi tutorial"))
        .await
        .unwrap();
    assert_eq!(second.status, ExecutionStatus::Completed);
    assert_eq!(second.new_results, 0);
    assert_eq!(second.shared_results, 3);

    // One record per distinct content, stats bumped once per execution.
    let fp = fingerprint("FastAPI docs", "https://fastapi.tiangolo.com", "# FastAPI");
    let result = ResultStore::find_by_fingerprint(store.as_ref(), &fp)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.found_count, 2);
    assert_eq!(result.unique_search_count, 2);

    // Two mappings: different executions, same result, first-discovery flag
    // only on the first.
    let history = coordinator.result_history(result.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_ne!(
        history[0].search_execution_id,
        history[1].search_execution_id
    );
    assert_eq!(history.iter().filter(|m| m.is_first_discovery).count(), 1);
}

#[tokio::test]
async fn positions_follow_backend_rank_order() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(MockBackend::new().on_search(
        "rust",
        vec![
            hit("first", "https://a.example", "a"),
            hit("second", "https://b.example", "b"),
            hit("third", "https://c.example", "c"),
        ],
    ));
    let coordinator = coordinator(&store, backend);

    let task = coordinator.execute(search_request("rust")).await.unwrap();
    let (rows, total) = coordinator.task_results(task.id, 1, 20).await.unwrap();

    assert_eq!(total, 3);
    let positions: Vec<i32> = rows.iter().map(|(m, _)| m.search_position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert_eq!(rows[0].1.title, "first");
    assert_eq!(rows[2].1.title, "third");
}

#[tokio::test]
async fn duplicate_hits_within_one_execution_share_and_map_once() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(MockBackend::new().on_search(
        "rust",
        vec![
            hit("same", "https://a.example", "identical"),
            hit("same", "https://a.example", "identical"),
        ],
    ));
    let coordinator = coordinator(&store, backend);

    let task = coordinator.execute(search_request("rust")).await.unwrap();
    assert_eq!(task.new_results, 1);
    assert_eq!(task.shared_results, 1);

    // Same (execution, result) pair twice - the duplicate mapping is skipped.
    let (rows, total) = coordinator.task_results(task.id, 1, 20).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].0.search_position, 1);
}

#[tokio::test]
async fn crawl_url_takes_priority_over_query() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(
        MockBackend::new().on_scrape("https://example.com/page", hit("Page", "https://example.com/page", "# Page")),
    );
    let coordinator = coordinator(&store, backend);

    let task = coordinator
        .execute(SearchRequest {
            name: "both".to_string(),
            query: Some("unregistered query".to_string()),
            crawl_url: Some("https://example.com/page".to_string()),
            config: SearchConfig::default(),
            created_by: "tester".to_string(),
        })
        .await
        .unwrap();

    // The unregistered query would have failed - success proves scrape ran.
    assert_eq!(task.status, ExecutionStatus::Completed);
    assert_eq!(task.total_results, 1);
}

#[tokio::test]
async fn missing_query_and_url_never_starts() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store, Arc::new(MockBackend::new()));

    let err = coordinator
        .execute(SearchRequest {
            name: "empty".to_string(),
            query: None,
            crawl_url: None,
            config: SearchConfig::default(),
            created_by: "tester".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SeineError::ConfigValidation(_)));

    // Nothing persisted: execution never started.
    let (tasks, total) = coordinator.list_tasks(1, 10, None).await.unwrap();
    assert_eq!(total, 0);
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn backend_failure_marks_task_failed_not_running() {
    let store = Arc::new(MemoryStore::new());
    let coordinator = coordinator(&store, Arc::new(MockBackend::new()));

    let task = coordinator
        .execute(search_request("unregistered"))
        .await
        .unwrap();
    assert_eq!(task.status, ExecutionStatus::Failed);
    assert!(task.error_message.as_deref().unwrap().contains("unregistered"));

    let stored = coordinator.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExecutionStatus::Failed);
}

// ---------------------------------------------------------------------------
// Mapping store: idempotent batch insert
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_batches_persist_each_pair_once() {
    let store = Arc::new(MemoryStore::new());
    let result_a = seed_result(&store, "a").await;
    let result_b = seed_result(&store, "b").await;
    let execution = Uuid::now_v7();
    let task = Uuid::now_v7();

    let m1 = Mapping::new(execution, result_a.id, task, 1, 0.5, true);
    let m2 = Mapping::new(execution, result_b.id, task, 2, 0.5, true);
    let m1_again = Mapping::new(execution, result_a.id, task, 1, 0.5, false);

    let skipped = MappingStore::batch_create(store.as_ref(), &[m1, m2]).await.unwrap();
    assert_eq!(skipped, 0);

    // Overlapping second batch: the duplicate pair is skipped, not an error.
    let skipped = MappingStore::batch_create(store.as_ref(), &[m1_again]).await.unwrap();
    assert_eq!(skipped, 1);

    let (rows, total) = MappingStore::results_by_execution(store.as_ref(), execution, 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn result_history_is_newest_first() {
    let store = Arc::new(MemoryStore::new());
    let result = seed_result(&store, "a").await;
    let task = Uuid::now_v7();

    for _ in 0..3 {
        let mapping = Mapping::new(Uuid::now_v7(), result.id, task, 1, 0.5, false);
        MappingStore::create(store.as_ref(), &mapping).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let history = MappingStore::mappings_by_result(store.as_ref(), result.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|w| w[0].found_at >= w[1].found_at));
}

// ---------------------------------------------------------------------------
// Curation workflow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_moves_raw_result_to_processing() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);
    let raw = seed_result(&store, "finding").await;

    let ds = workflow
        .create_data_source("Report", "curated findings", "alice", vec![])
        .await
        .unwrap();
    let ds = workflow
        .add_raw_data(ds.id, raw.id, RawDataKind::Instant, "alice")
        .await
        .unwrap();

    assert_eq!(ds.total_raw_data_count, 1);
    assert_eq!(ds.instant_data_count, 1);
    assert_eq!(result_status(&store, raw.id).await, ResultStatus::Processing);
}

#[tokio::test]
async fn add_rejects_data_already_in_progress() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);
    let raw = seed_result(&store, "busy").await;
    ResultStore::update_status(store.as_ref(), raw.id, ResultStatus::Processing)
        .await
        .unwrap();

    let ds = workflow
        .create_data_source("Report", "d", "alice", vec![])
        .await
        .unwrap();
    let err = workflow
        .add_raw_data(ds.id, raw.id, RawDataKind::Instant, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, SeineError::InvalidState { .. }));
}

#[tokio::test]
async fn remove_archives_the_raw_result() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);
    let raw = seed_result(&store, "removable").await;

    let ds = workflow
        .create_data_source("Report", "d", "alice", vec![])
        .await
        .unwrap();
    workflow
        .add_raw_data(ds.id, raw.id, RawDataKind::Scheduled, "alice")
        .await
        .unwrap();
    let ds = workflow
        .remove_raw_data(ds.id, raw.id, "alice")
        .await
        .unwrap();

    assert_eq!(ds.total_raw_data_count, 0);
    assert_eq!(ds.scheduled_data_count, 0);
    assert_eq!(result_status(&store, raw.id).await, ResultStatus::Archived);
}

#[tokio::test]
async fn confirming_an_empty_data_source_fails() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);

    let ds = workflow
        .create_data_source("Empty", "d", "alice", vec![])
        .await
        .unwrap();
    let err = workflow.confirm(ds.id, "alice").await.unwrap_err();
    assert!(matches!(err, SeineError::InvalidState { .. }));
}

#[tokio::test]
async fn confirm_then_revert_round_trips() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);
    let raw_a = seed_result(&store, "a").await;
    let raw_b = seed_result(&store, "b").await;

    let ds = workflow
        .create_data_source("Report", "d", "alice", vec![])
        .await
        .unwrap();
    workflow
        .add_raw_data(ds.id, raw_a.id, RawDataKind::Instant, "alice")
        .await
        .unwrap();
    workflow
        .add_raw_data(ds.id, raw_b.id, RawDataKind::Scheduled, "alice")
        .await
        .unwrap();

    let ds = workflow.confirm(ds.id, "bob").await.unwrap();
    assert_eq!(ds.status, DataSourceStatus::Confirmed);
    assert_eq!(ds.confirmed_by.as_deref(), Some("bob"));
    assert_eq!(result_status(&store, raw_a.id).await, ResultStatus::Completed);
    assert_eq!(result_status(&store, raw_b.id).await, ResultStatus::Completed);

    let ds = workflow.revert(ds.id, "carol").await.unwrap();
    assert_eq!(ds.status, DataSourceStatus::Draft);
    assert!(ds.confirmed_by.is_none());
    assert!(ds.confirmed_at.is_none());
    assert_eq!(result_status(&store, raw_a.id).await, ResultStatus::Processing);
    assert_eq!(result_status(&store, raw_b.id).await, ResultStatus::Processing);
}

#[tokio::test]
async fn confirmed_data_source_is_not_editable() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);
    let raw = seed_result(&store, "a").await;
    let extra = seed_result(&store, "extra").await;

    let ds = workflow
        .create_data_source("Report", "d", "alice", vec![])
        .await
        .unwrap();
    workflow
        .add_raw_data(ds.id, raw.id, RawDataKind::Instant, "alice")
        .await
        .unwrap();
    workflow.confirm(ds.id, "alice").await.unwrap();

    let err = workflow
        .add_raw_data(ds.id, extra.id, RawDataKind::Instant, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, SeineError::InvalidState { .. }));

    let err = workflow
        .update_content(ds.id, "edited".to_string(), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, SeineError::InvalidState { .. }));
}

#[tokio::test]
async fn deleting_a_draft_archives_its_results() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);
    let raw = seed_result(&store, "a").await;

    let ds = workflow
        .create_data_source("Report", "d", "alice", vec![])
        .await
        .unwrap();
    workflow
        .add_raw_data(ds.id, raw.id, RawDataKind::Instant, "alice")
        .await
        .unwrap();
    workflow.delete(ds.id, "alice").await.unwrap();

    assert!(workflow.get_data_source(ds.id).await.unwrap().is_none());
    assert_eq!(result_status(&store, raw.id).await, ResultStatus::Archived);
}

#[tokio::test]
async fn deleting_a_confirmed_source_keeps_results_completed() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);
    let raw = seed_result(&store, "a").await;

    let ds = workflow
        .create_data_source("Report", "d", "alice", vec![])
        .await
        .unwrap();
    workflow
        .add_raw_data(ds.id, raw.id, RawDataKind::Instant, "alice")
        .await
        .unwrap();
    workflow.confirm(ds.id, "alice").await.unwrap();
    workflow.delete(ds.id, "alice").await.unwrap();

    assert!(workflow.get_data_source(ds.id).await.unwrap().is_none());
    assert_eq!(result_status(&store, raw.id).await, ResultStatus::Completed);
}

#[tokio::test]
async fn draft_content_edits_bump_the_version() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);

    let ds = workflow
        .create_data_source("Report", "d", "alice", vec![])
        .await
        .unwrap();
    let ds = workflow
        .update_content(ds.id, "# v1".to_string(), "alice")
        .await
        .unwrap();
    assert_eq!(ds.content_version, 1);
    let ds = workflow
        .update_content(ds.id, "# v2".to_string(), "alice")
        .await
        .unwrap();
    assert_eq!(ds.content_version, 2);
    assert_eq!(ds.edited_content.as_deref(), Some("# v2"));
}

#[tokio::test]
async fn batch_operations_touch_only_requested_results() {
    let store = Arc::new(MemoryStore::new());
    let workflow = curation(&store);
    let a = seed_result(&store, "a").await;
    let b = seed_result(&store, "b").await;
    let untouched = seed_result(&store, "c").await;

    let archived = workflow
        .batch_archive_raw_data(&[a.id, b.id], "alice")
        .await
        .unwrap();
    assert_eq!(archived, 2);
    assert_eq!(result_status(&store, a.id).await, ResultStatus::Archived);
    assert_eq!(result_status(&store, untouched.id).await, ResultStatus::Pending);

    let deleted = workflow.batch_delete_raw_data(&[a.id], "alice").await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(result_status(&store, a.id).await, ResultStatus::Deleted);
}

// ---------------------------------------------------------------------------
// Orchestrator: decompose → confirm → fan out → aggregate
// ---------------------------------------------------------------------------

fn decompose_request(query: &str) -> DecomposeRequest {
    DecomposeRequest {
        name: format!("smart: {query}"),
        query: query.to_string(),
        config: SearchConfig::default(),
        created_by: "tester".to_string(),
    }
}

#[tokio::test]
async fn decomposition_awaits_confirmation_and_caches() {
    let decomposer = MockDecomposer::new().on_query("big question", decomposition_of(&["q1", "q2"]));
    let (_store, decomposer, orchestrator) = orchestrator(MockBackend::new(), decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("big question"))
        .await
        .unwrap();
    assert_eq!(task.status, OrchestrationStatus::AwaitingConfirmation);
    assert_eq!(task.sub_queries.len(), 2);
    assert_eq!(task.llm_model, "mock");

    // Same query + context again: served from cache, LLM not re-invoked.
    orchestrator
        .decompose_query(decompose_request("big question"))
        .await
        .unwrap();
    assert_eq!(decomposer.calls(), 1);
}

#[tokio::test]
async fn failed_decomposition_marks_the_task_failed() {
    let (_store, _decomposer, orchestrator) =
        orchestrator(MockBackend::new(), MockDecomposer::new());

    let err = orchestrator
        .decompose_query(decompose_request("nothing registered"))
        .await
        .unwrap_err();
    assert!(matches!(err, SeineError::Backend(_)));
}

#[tokio::test]
async fn full_run_deduplicates_across_sub_queries() {
    let shared = hit_with_score("Shared", "https://shared.example", "# shared", 0.5);
    let backend = MockBackend::new()
        .on_search(
            "q1",
            vec![
                shared.clone(),
                hit_with_score("Only q1", "https://solo.example", "# solo", 0.5),
            ],
        )
        .on_search("q2", vec![shared.clone()]);
    let decomposer = MockDecomposer::new().on_query("topic", decomposition_of(&["q1", "q2"]));
    let (store, _decomposer, orchestrator) = orchestrator(backend, decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    let task = orchestrator
        .confirm_and_execute(task.id, vec!["q1".to_string(), "q2".to_string()])
        .await
        .unwrap();

    assert_eq!(task.status, OrchestrationStatus::Completed);
    let stats = task.stats.clone().unwrap();
    assert_eq!(stats.total_searches, 2);
    assert_eq!(stats.successful_searches, 2);
    assert_eq!(stats.total_results_raw, 3);
    assert_eq!(stats.total_results_deduplicated, 2);
    assert_eq!(stats.duplication_rate, 0.33);

    // The shared result was discovered by both executions.
    let fp = fingerprint("Shared", "https://shared.example", "# shared");
    let result = ResultStore::find_by_fingerprint(store.as_ref(), &fp)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.found_count, 2);

    let view = orchestrator
        .get_aggregated_results(task.id, ViewMode::Combined, 1, 10)
        .await
        .unwrap();
    let AggregatedView::Combined { results, total, .. } = view else {
        panic!("expected combined view");
    };
    assert_eq!(total, 2);

    // Multi-source result outranks the single-source one:
    // shared: 0.4*(2/2) + 0.4*0.5 + 0.2*(1/(1+1)) = 0.7
    // solo:   0.4*(1/2) + 0.4*0.5 + 0.2*(1/(1+2)) = 0.4667
    assert_eq!(results[0].title, "Shared");
    assert_eq!(results[0].source_count, 2);
    assert!(results[0].multi_source_bonus);
    assert_eq!(results[0].composite_score, 0.7);
    assert_eq!(results[1].title, "Only q1");
    assert_eq!(results[1].source_count, 1);
    assert_eq!(results[1].composite_score, 0.4667);
    assert!(results[0].sources.iter().any(|s| s.query == "q2"));
}

#[tokio::test]
async fn one_failed_sub_search_is_partial_success() {
    let backend = MockBackend::new()
        .on_search("q1", vec![hit("A", "https://a.example", "a")])
        .on_search("q2", vec![hit("B", "https://b.example", "b")]);
    // "q3" is unregistered - that sub-search fails.
    let decomposer =
        MockDecomposer::new().on_query("topic", decomposition_of(&["q1", "q2", "q3"]));
    let (_store, _decomposer, orchestrator) = orchestrator(backend, decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    let task = orchestrator
        .confirm_and_execute(
            task.id,
            vec!["q1".to_string(), "q2".to_string(), "q3".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(task.status, OrchestrationStatus::PartialSuccess);
    let stats = task.stats.clone().unwrap();
    assert_eq!(stats.failed_searches, 1);
    assert_eq!(stats.successful_searches, 2);

    let failed = task
        .sub_search_outcomes
        .iter()
        .find(|o| o.query == "q3")
        .unwrap();
    assert_eq!(failed.status, ExecutionStatus::Failed);
    assert!(failed.retryable);
    assert!(failed.error.is_some());

    // The failed sub-query contributes zero entries to any sources list.
    let view = orchestrator
        .get_aggregated_results(task.id, ViewMode::Combined, 1, 10)
        .await
        .unwrap();
    let AggregatedView::Combined { results, .. } = view else {
        panic!("expected combined view");
    };
    assert!(results
        .iter()
        .all(|r| r.sources.iter().all(|s| s.query != "q3")));
}

#[tokio::test]
async fn all_sub_searches_failing_fails_the_run() {
    let decomposer = MockDecomposer::new().on_query("topic", decomposition_of(&["q1", "q2"]));
    let (_store, _decomposer, orchestrator) = orchestrator(MockBackend::new(), decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    let task = orchestrator
        .confirm_and_execute(task.id, vec!["q1".to_string(), "q2".to_string()])
        .await
        .unwrap();

    assert_eq!(task.status, OrchestrationStatus::Failed);
    assert!(task.error_message.as_deref().unwrap().contains("all sub-searches failed"));
    let stats = task.stats.clone().unwrap();
    assert_eq!(stats.successful_searches, 0);
    assert_eq!(stats.failed_searches, 2);
}

#[tokio::test]
async fn user_edits_to_sub_queries_are_recorded() {
    let backend = MockBackend::new()
        .on_search("kept", vec![hit("K", "https://k.example", "k")])
        .on_search("added", vec![hit("N", "https://n.example", "n")]);
    let decomposer =
        MockDecomposer::new().on_query("topic", decomposition_of(&["kept", "dropped"]));
    let (_store, _decomposer, orchestrator) = orchestrator(backend, decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    let task = orchestrator
        .confirm_and_execute(task.id, vec!["kept".to_string(), "added".to_string()])
        .await
        .unwrap();

    let modifications = task.user_modifications.clone().unwrap();
    assert_eq!(modifications.added, vec!["added".to_string()]);
    assert_eq!(modifications.removed, vec!["dropped".to_string()]);
    assert_eq!(task.confirmed_queries.len(), 2);
    assert!(task.confirmed_at.is_some());
}

#[tokio::test]
async fn confirm_requires_awaiting_confirmation() {
    let backend = MockBackend::new().on_search("q1", vec![hit("A", "https://a.example", "a")]);
    let decomposer = MockDecomposer::new().on_query("topic", decomposition_of(&["q1"]));
    let (_store, _decomposer, orchestrator) = orchestrator(backend, decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    orchestrator
        .confirm_and_execute(task.id, vec!["q1".to_string()])
        .await
        .unwrap();

    // Second confirmation: the task has left awaiting_confirmation.
    let err = orchestrator
        .confirm_and_execute(task.id, vec!["q1".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, SeineError::InvalidState { .. }));
}

#[tokio::test]
async fn expiry_is_only_reachable_from_awaiting_confirmation() {
    let decomposer = MockDecomposer::new().on_query("topic", decomposition_of(&["q1"]));
    let (_store, _decomposer, orchestrator) = orchestrator(MockBackend::new(), decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    let task = orchestrator.mark_expired(task.id).await.unwrap();
    assert_eq!(task.status, OrchestrationStatus::Expired);

    // Expired tasks cannot be confirmed or re-expired.
    let err = orchestrator
        .confirm_and_execute(task.id, vec!["q1".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, SeineError::InvalidState { .. }));
    let err = orchestrator.mark_expired(task.id).await.unwrap_err();
    assert!(matches!(err, SeineError::InvalidState { .. }));
}

#[tokio::test]
async fn results_are_unavailable_before_the_run_finishes() {
    let decomposer = MockDecomposer::new().on_query("topic", decomposition_of(&["q1"]));
    let (_store, _decomposer, orchestrator) = orchestrator(MockBackend::new(), decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    let err = orchestrator
        .get_aggregated_results(task.id, ViewMode::Combined, 1, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, SeineError::InvalidState { .. }));
}

#[tokio::test]
async fn by_query_view_groups_results_per_sub_search() {
    let backend = MockBackend::new()
        .on_search(
            "q1",
            vec![
                hit("A", "https://a.example", "a"),
                hit("B", "https://b.example", "b"),
            ],
        )
        .on_search("q2", vec![hit("C", "https://c.example", "c")]);
    let decomposer = MockDecomposer::new().on_query("topic", decomposition_of(&["q1", "q2"]));
    let (_store, _decomposer, orchestrator) = orchestrator(backend, decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    let task = orchestrator
        .confirm_and_execute(task.id, vec!["q1".to_string(), "q2".to_string()])
        .await
        .unwrap();

    let view = orchestrator
        .get_aggregated_results(task.id, ViewMode::ByQuery, 1, 10)
        .await
        .unwrap();
    let AggregatedView::ByQuery { groups } = view else {
        panic!("expected by-query view");
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].query, "q1");
    assert_eq!(groups[0].total, 2);
    assert_eq!(groups[1].query, "q2");
    assert_eq!(groups[1].total, 1);
}

#[tokio::test]
async fn combined_view_paginates() {
    let hits: Vec<_> = (0..5)
        .map(|i| hit(&format!("r{i}"), &format!("https://r{i}.example"), "body"))
        .collect();
    let backend = MockBackend::new().on_search("q1", hits);
    let decomposer = MockDecomposer::new().on_query("topic", decomposition_of(&["q1"]));
    let (_store, _decomposer, orchestrator) = orchestrator(backend, decomposer);

    let task = orchestrator
        .decompose_query(decompose_request("topic"))
        .await
        .unwrap();
    let task = orchestrator
        .confirm_and_execute(task.id, vec!["q1".to_string()])
        .await
        .unwrap();

    let AggregatedView::Combined { results, total, .. } = orchestrator
        .get_aggregated_results(task.id, ViewMode::Combined, 2, 2)
        .await
        .unwrap()
    else {
        panic!("expected combined view");
    };
    assert_eq!(total, 5);
    assert_eq!(results.len(), 2);
}
