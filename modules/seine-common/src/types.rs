use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Lifecycle of a fetched result, driven by the curation workflow - the
/// fetch/dedup pipeline only ever creates results as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Pending,
    Archived,
    Processing,
    Completed,
    Deleted,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Archived => "archived",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResultStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "archived" => Ok(Self::Archived),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "deleted" => Ok(Self::Deleted),
            _ => Err(format!("Unknown result status: {s}")),
        }
    }
}

/// Lifecycle of one search/crawl execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown execution status: {s}")),
        }
    }
}

/// Lifecycle of a multi-query orchestration task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationStatus {
    AwaitingConfirmation,
    Searching,
    Completed,
    PartialSuccess,
    Failed,
    /// Confirmation window elapsed. Reachable only from AwaitingConfirmation;
    /// the timeout itself is enforced outside this core.
    Expired,
}

impl OrchestrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Searching => "searching",
            Self::Completed => "completed",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for OrchestrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrchestrationStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_confirmation" => Ok(Self::AwaitingConfirmation),
            "searching" => Ok(Self::Searching),
            "completed" => Ok(Self::Completed),
            "partial_success" => Ok(Self::PartialSuccess),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Unknown orchestration status: {s}")),
        }
    }
}

/// A curated data source is either an editable draft or confirmed. Both
/// directions are reachable (confirm / revert).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceStatus {
    Draft,
    Confirmed,
}

impl DataSourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
        }
    }
}

impl std::fmt::Display for DataSourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataSourceStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "confirmed" => Ok(Self::Confirmed),
            _ => Err(format!("Unknown data source status: {s}")),
        }
    }
}

/// Which pipeline produced a referenced raw result. Both kinds live in the
/// same global result store; the kind drives the per-source counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawDataKind {
    /// Result of a recurring scheduled search task.
    Scheduled,
    /// Result of a one-shot search execution.
    Instant,
}

impl RawDataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Instant => "instant",
        }
    }
}

impl std::fmt::Display for RawDataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RawDataKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "instant" => Ok(Self::Instant),
            _ => Err(format!("Unknown raw data kind: {s}")),
        }
    }
}

/// How one execution fetches content. Crawl (URL) mode wins when both a
/// query and a URL are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Search,
    Crawl,
}

// ---------------------------------------------------------------------------
// Search configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    pub limit: Option<u32>,
    pub language: Option<String>,
    #[serde(default)]
    pub include_domains: Vec<String>,
    #[serde(default)]
    pub exclude_domains: Vec<String>,
    pub time_range: Option<String>,
}

/// The context under which a query was decomposed. Part of the cache key:
/// the same query under a different context is a different decomposition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchContext {
    pub target_domains: Option<String>,
    pub language: Option<String>,
    pub time_range: Option<String>,
}

impl From<&SearchConfig> for SearchContext {
    fn from(config: &SearchConfig) -> Self {
        Self {
            target_domains: config.include_domains.first().cloned(),
            language: config.language.clone(),
            time_range: config.time_range.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetched results and discovery mappings
// ---------------------------------------------------------------------------

/// A globally unique fetched result. Created once on first discovery; every
/// re-discovery only bumps the stats, every curation transition only moves
/// the status. Never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedResult {
    pub id: Uuid,
    /// Task that first discovered this result.
    pub task_id: Uuid,
    pub title: String,
    pub url: String,
    pub url_normalized: String,
    pub snippet: Option<String>,
    pub markdown_content: Option<String>,
    pub html_content: Option<String>,
    /// Hash of title + url + markdown content - the global dedup key.
    pub content_fingerprint: String,
    pub source: String,
    pub relevance_score: f64,
    pub metadata: serde_json::Value,
    pub status: ResultStatus,
    pub first_found_at: DateTime<Utc>,
    pub last_found_at: DateTime<Utc>,
    pub found_count: i64,
    pub unique_search_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One search execution having found one specific result, at some rank and
/// relevance. Immutable once written; unique per (execution, result) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryMapping {
    pub id: Uuid,
    pub search_execution_id: Uuid,
    pub result_id: Uuid,
    /// Denormalized owner task, for query convenience.
    pub task_id: Uuid,
    /// 1-based rank within this execution, straight from the backend order.
    pub search_position: i32,
    /// Score in this execution - the same result may score differently
    /// across executions.
    pub relevance_score: f64,
    /// True iff this execution created the result (fingerprint miss).
    pub is_first_discovery: bool,
    pub found_at: DateTime<Utc>,
}

impl DiscoveryMapping {
    pub fn new(
        search_execution_id: Uuid,
        result_id: Uuid,
        task_id: Uuid,
        search_position: i32,
        relevance_score: f64,
        is_first_discovery: bool,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            search_execution_id,
            result_id,
            task_id,
            search_position,
            relevance_score,
            is_first_discovery,
            found_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search tasks
// ---------------------------------------------------------------------------

/// One search/crawl execution request and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTask {
    pub id: Uuid,
    pub name: String,
    pub query: Option<String>,
    pub crawl_url: Option<String>,
    /// Join key between this run and the discovery mappings it created.
    pub search_execution_id: Uuid,
    pub config: SearchConfig,
    pub status: ExecutionStatus,
    pub total_results: i64,
    pub new_results: i64,
    pub shared_results: i64,
    pub credits_used: i64,
    pub execution_time_ms: i64,
    pub error_message: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SearchTask {
    pub fn new(
        name: impl Into<String>,
        query: Option<String>,
        crawl_url: Option<String>,
        config: SearchConfig,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            query,
            crawl_url,
            search_execution_id: Uuid::now_v7(),
            config,
            status: ExecutionStatus::Pending,
            total_results: 0,
            new_results: 0,
            shared_results: 0,
            credits_used: 0,
            execution_time_ms: 0,
            error_message: None,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// URL mode takes priority when both query and URL are set.
    pub fn search_mode(&self) -> Option<SearchMode> {
        if self.crawl_url.as_deref().is_some_and(|u| !u.is_empty()) {
            Some(SearchMode::Crawl)
        } else if self.query.as_deref().is_some_and(|q| !q.is_empty()) {
            Some(SearchMode::Search)
        } else {
            None
        }
    }

    pub fn mark_running(&mut self) {
        self.status = ExecutionStatus::Running;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(
        &mut self,
        total: i64,
        new: i64,
        shared: i64,
        credits: i64,
        execution_time_ms: i64,
    ) {
        self.status = ExecutionStatus::Completed;
        self.total_results = total;
        self.new_results = new;
        self.shared_results = shared;
        self.credits_used = credits;
        self.execution_time_ms = execution_time_ms;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Orchestration tasks
// ---------------------------------------------------------------------------

/// One sub-query produced by decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuery {
    pub query: String,
    pub reasoning: String,
    pub focus: String,
}

/// A validated query decomposition, as cached and attached to tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDecomposition {
    pub sub_queries: Vec<SubQuery>,
    pub overall_strategy: String,
    pub model: String,
    pub tokens_used: i64,
}

/// What the user changed between decomposition and confirmation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserModifications {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Per-sub-search outcome record on an orchestration task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubSearchOutcome {
    pub query: String,
    pub task_id: Uuid,
    pub status: ExecutionStatus,
    pub result_count: i64,
    pub credits_used: i64,
    pub execution_time_ms: i64,
    pub error: Option<String>,
    pub retryable: bool,
}

/// Run-level statistics computed by aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationStats {
    pub total_searches: i64,
    pub successful_searches: i64,
    pub failed_searches: i64,
    pub total_results_raw: i64,
    pub total_results_deduplicated: i64,
    pub duplication_rate: f64,
    pub total_credits_used: i64,
}

/// A multi-query search task: decomposition, user confirmation, concurrent
/// sub-searches, aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationTask {
    pub id: Uuid,
    pub name: String,
    pub original_query: String,
    pub config: SearchConfig,
    pub sub_queries: Vec<SubQuery>,
    pub llm_model: String,
    pub overall_strategy: String,
    pub decomposition_tokens: i64,
    pub confirmed_queries: Vec<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub user_modifications: Option<UserModifications>,
    pub sub_task_ids: Vec<Uuid>,
    pub sub_search_outcomes: Vec<SubSearchOutcome>,
    pub stats: Option<AggregationStats>,
    pub status: OrchestrationStatus,
    pub error_message: Option<String>,
    pub execution_time_ms: i64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrchestrationTask {
    pub fn new(
        name: impl Into<String>,
        original_query: impl Into<String>,
        config: SearchConfig,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            original_query: original_query.into(),
            config,
            sub_queries: Vec::new(),
            llm_model: String::new(),
            overall_strategy: String::new(),
            decomposition_tokens: 0,
            confirmed_queries: Vec::new(),
            confirmed_at: None,
            user_modifications: None,
            sub_task_ids: Vec::new(),
            sub_search_outcomes: Vec::new(),
            stats: None,
            status: OrchestrationStatus::AwaitingConfirmation,
            error_message: None,
            execution_time_ms: 0,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_decomposition(&mut self, decomposition: &QueryDecomposition) {
        self.sub_queries = decomposition.sub_queries.clone();
        self.llm_model = decomposition.model.clone();
        self.overall_strategy = decomposition.overall_strategy.clone();
        self.decomposition_tokens = decomposition.tokens_used;
        self.status = OrchestrationStatus::AwaitingConfirmation;
        self.updated_at = Utc::now();
    }

    pub fn mark_searching(&mut self) {
        self.status = OrchestrationStatus::Searching;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, stats: AggregationStats) {
        self.status = OrchestrationStatus::Completed;
        self.stats = Some(stats);
        self.updated_at = Utc::now();
    }

    pub fn mark_partial_success(&mut self, stats: AggregationStats) {
        self.status = OrchestrationStatus::PartialSuccess;
        self.stats = Some(stats);
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = OrchestrationStatus::Failed;
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
    }

    pub fn mark_expired(&mut self) {
        self.status = OrchestrationStatus::Expired;
        self.error_message = Some("confirmation window elapsed".to_string());
        self.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Aggregated results
// ---------------------------------------------------------------------------

/// One sub-query execution in which an aggregated result appeared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub query: String,
    pub sub_task_id: Uuid,
    pub position: i32,
    pub relevance_score: f64,
}

/// A fingerprint group across sub-searches, scored and ranked. Created once
/// when aggregation completes; never updated incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub id: Uuid,
    pub parent_task_id: Uuid,
    /// Representative fetched result for this fingerprint group.
    pub result_id: Uuid,
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
    pub content_fingerprint: String,
    pub composite_score: f64,
    /// Never empty; source_count == sources.len().
    pub sources: Vec<SourceRef>,
    pub source_count: i64,
    pub multi_source_bonus: bool,
    pub status: ResultStatus,
    pub first_found_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Data sources (curation)
// ---------------------------------------------------------------------------

/// Reference from a data source to one raw result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDataRef {
    pub data_id: Uuid,
    pub kind: RawDataKind,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub added_at: DateTime<Utc>,
    pub added_by: String,
}

/// A curated "data source" document built from raw results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: DataSourceStatus,
    pub raw_data_refs: Vec<RawDataRef>,
    // Derived counters, recomputed from raw_data_refs on every mutation.
    pub total_raw_data_count: i64,
    pub scheduled_data_count: i64,
    pub instant_data_count: i64,
    pub edited_content: Option<String>,
    pub content_version: i64,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DataSource {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        let created_by = created_by.into();
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            description: description.into(),
            tags,
            status: DataSourceStatus::Draft,
            raw_data_refs: Vec::new(),
            total_raw_data_count: 0,
            scheduled_data_count: 0,
            instant_data_count: 0,
            edited_content: None,
            content_version: 0,
            confirmed_by: None,
            confirmed_at: None,
            updated_by: created_by.clone(),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_edit(&self) -> bool {
        self.status == DataSourceStatus::Draft
    }

    /// Confirmation requires a draft with at least one raw reference.
    pub fn can_confirm(&self) -> bool {
        self.status == DataSourceStatus::Draft && self.total_raw_data_count > 0
    }

    pub fn add_ref(&mut self, raw_ref: RawDataRef, added_by: &str) {
        self.raw_data_refs.push(raw_ref);
        self.updated_by = added_by.to_string();
        self.recompute_counts();
    }

    /// Remove the reference for `data_id`. Returns false if absent.
    pub fn remove_ref(&mut self, data_id: Uuid, removed_by: &str) -> bool {
        let before = self.raw_data_refs.len();
        self.raw_data_refs.retain(|r| r.data_id != data_id);
        if self.raw_data_refs.len() == before {
            return false;
        }
        self.updated_by = removed_by.to_string();
        self.recompute_counts();
        true
    }

    fn recompute_counts(&mut self) {
        self.total_raw_data_count = self.raw_data_refs.len() as i64;
        self.scheduled_data_count = self
            .raw_data_refs
            .iter()
            .filter(|r| r.kind == RawDataKind::Scheduled)
            .count() as i64;
        self.instant_data_count = self
            .raw_data_refs
            .iter()
            .filter(|r| r.kind == RawDataKind::Instant)
            .count() as i64;
        self.updated_at = Utc::now();
    }

    pub fn confirm(&mut self, confirmed_by: &str) {
        self.status = DataSourceStatus::Confirmed;
        self.confirmed_by = Some(confirmed_by.to_string());
        self.confirmed_at = Some(Utc::now());
        self.updated_by = confirmed_by.to_string();
        self.updated_at = Utc::now();
    }

    pub fn revert_to_draft(&mut self, reverted_by: &str) {
        self.status = DataSourceStatus::Draft;
        self.confirmed_by = None;
        self.confirmed_at = None;
        self.updated_by = reverted_by.to_string();
        self.updated_at = Utc::now();
    }

    pub fn raw_ids(&self) -> Vec<Uuid> {
        self.raw_data_refs.iter().map(|r| r.data_id).collect()
    }

    pub fn raw_ids_by_kind(&self, kind: RawDataKind) -> Vec<Uuid> {
        self.raw_data_refs
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.data_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_url_wins_over_query() {
        let task = SearchTask::new(
            "both",
            Some("rust".to_string()),
            Some("https://example.com".to_string()),
            SearchConfig::default(),
            "tester",
        );
        assert_eq!(task.search_mode(), Some(SearchMode::Crawl));
    }

    #[test]
    fn neither_query_nor_url_has_no_mode() {
        let task = SearchTask::new("empty", None, None, SearchConfig::default(), "tester");
        assert_eq!(task.search_mode(), None);
    }

    #[test]
    fn data_source_counters_follow_refs() {
        let mut ds = DataSource::new("t", "d", "alice", vec![]);
        assert!(!ds.can_confirm());

        let id = Uuid::now_v7();
        ds.add_ref(
            RawDataRef {
                data_id: id,
                kind: RawDataKind::Instant,
                title: "r".to_string(),
                url: "https://example.com".to_string(),
                snippet: String::new(),
                added_at: Utc::now(),
                added_by: "alice".to_string(),
            },
            "alice",
        );
        assert_eq!(ds.total_raw_data_count, 1);
        assert_eq!(ds.instant_data_count, 1);
        assert_eq!(ds.scheduled_data_count, 0);
        assert!(ds.can_confirm());

        assert!(ds.remove_ref(id, "alice"));
        assert_eq!(ds.total_raw_data_count, 0);
        assert!(!ds.remove_ref(id, "alice"));
    }

    #[test]
    fn confirm_then_revert_clears_confirmation_fields() {
        let mut ds = DataSource::new("t", "d", "alice", vec![]);
        ds.confirm("bob");
        assert_eq!(ds.status, DataSourceStatus::Confirmed);
        assert_eq!(ds.confirmed_by.as_deref(), Some("bob"));
        assert!(ds.confirmed_at.is_some());

        ds.revert_to_draft("carol");
        assert_eq!(ds.status, DataSourceStatus::Draft);
        assert!(ds.confirmed_by.is_none());
        assert!(ds.confirmed_at.is_none());
    }

    #[test]
    fn status_enums_round_trip_through_strings() {
        for s in [
            ResultStatus::Pending,
            ResultStatus::Archived,
            ResultStatus::Processing,
            ResultStatus::Completed,
            ResultStatus::Deleted,
        ] {
            assert_eq!(s.as_str().parse::<ResultStatus>().unwrap(), s);
        }
        assert!("bogus".parse::<ResultStatus>().is_err());
    }
}
