//! Store seams for the dedup/mapping/curation engine.
//!
//! Every component takes its stores as trait objects - no module-level
//! singletons. Two implementations: Postgres (production) and in-memory
//! (embeddable, and what the boundary tests run against).
//!
//! The only safe concurrent-mutation primitives are the ones these traits
//! expose: the atomic discovery-stats increment and the unique-constrained
//! insert. Nothing else locks.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use seine_common::{
    AggregatedResult, DataSource, DiscoveryMapping, ExecutionStatus, FetchedResult,
    OrchestrationTask, QueryDecomposition, ResultStatus, SearchContext, SearchTask, StoreError,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A mapping joined with its result, in execution rank order.
pub type MappedResult = (DiscoveryMapping, FetchedResult);

/// Globally unique fetched results, keyed by content fingerprint.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert a new result. Fails with `StoreError::DuplicateKey` if the
    /// fingerprint already exists - callers must check `find_by_fingerprint`
    /// first and branch; there is no upsert.
    async fn create(&self, result: &FetchedResult) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<FetchedResult>, StoreError>;

    /// Exact-match lookup on the uniquely indexed fingerprint.
    async fn find_by_fingerprint(&self, fingerprint: &str)
        -> Result<Option<FetchedResult>, StoreError>;

    /// Atomically bump last_found_at / found_count / unique_search_count.
    /// A single store-side operation - safe under concurrent discovery from
    /// parallel sub-searches. Returns false if the result does not exist.
    async fn increment_discovery_stats(&self, result_id: Uuid) -> Result<bool, StoreError>;

    /// Used only by the curation workflow.
    async fn update_status(&self, result_id: Uuid, status: ResultStatus)
        -> Result<bool, StoreError>;

    /// Used only by the curation workflow. Returns the number updated.
    async fn bulk_update_status(
        &self,
        ids: &[Uuid],
        status: ResultStatus,
    ) -> Result<u64, StoreError>;
}

/// Many-to-many relation between search executions and results.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn create(&self, mapping: &DiscoveryMapping) -> Result<(), StoreError>;

    /// Insert a batch, tolerating duplicates on (execution, result): the
    /// non-conflicting subset is inserted, duplicates are skipped, and the
    /// skipped count is returned. Never aborts the batch for one duplicate.
    async fn batch_create(&self, mappings: &[DiscoveryMapping]) -> Result<usize, StoreError>;

    /// Join mappings for one execution with their results, ordered by
    /// search_position ascending, paginated. Returns (rows, total).
    async fn results_by_execution(
        &self,
        execution_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<MappedResult>, u64), StoreError>;

    /// Unpaginated variant for aggregation, same ordering.
    async fn all_results_by_execution(
        &self,
        execution_id: Uuid,
    ) -> Result<Vec<MappedResult>, StoreError>;

    /// A result's discovery history, newest first.
    async fn mappings_by_result(&self, result_id: Uuid)
        -> Result<Vec<DiscoveryMapping>, StoreError>;
}

/// Persisted search-execution tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: &SearchTask) -> Result<(), StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<SearchTask>, StoreError>;
    async fn update(&self, task: &SearchTask) -> Result<(), StoreError>;
    async fn list(
        &self,
        page: u32,
        page_size: u32,
        status: Option<ExecutionStatus>,
    ) -> Result<(Vec<SearchTask>, u64), StoreError>;
}

/// Persisted orchestration tasks.
#[async_trait]
pub trait OrchestrationStore: Send + Sync {
    async fn insert(&self, task: &OrchestrationTask) -> Result<(), StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<OrchestrationTask>, StoreError>;
    async fn update(&self, task: &OrchestrationTask) -> Result<(), StoreError>;
}

/// Aggregated results, grouped under their parent orchestration task.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Replace the aggregation output for a task. Aggregation is a batch,
    /// run-once-per-task operation, so this overwrites wholesale.
    async fn replace_for_task(
        &self,
        parent_task_id: Uuid,
        results: &[AggregatedResult],
    ) -> Result<(), StoreError>;

    /// Page through a task's aggregation, composite score descending.
    async fn list_by_task(
        &self,
        parent_task_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<AggregatedResult>, u64), StoreError>;

    async fn delete_by_task(&self, parent_task_id: Uuid) -> Result<u64, StoreError>;
}

/// A raw-result status change applied alongside a data-source transition.
#[derive(Debug, Clone)]
pub struct StatusSync {
    pub ids: Vec<Uuid>,
    pub status: ResultStatus,
}

impl StatusSync {
    pub fn none() -> Self {
        Self {
            ids: Vec::new(),
            status: ResultStatus::Pending,
        }
    }
}

/// The data-source side of a curation transition.
#[derive(Debug, Clone)]
pub enum DataSourceChange {
    Upsert(DataSource),
    Delete(Uuid),
}

/// Curated data-source documents, with the one transactional primitive the
/// curation workflow needs.
#[async_trait]
pub trait CurationStore: Send + Sync {
    async fn insert(&self, data_source: &DataSource) -> Result<(), StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<DataSource>, StoreError>;
    async fn list(&self, page: u32, page_size: u32) -> Result<(Vec<DataSource>, u64), StoreError>;

    /// Apply a data-source change and a raw-result status sync in ONE
    /// transaction. Either everything lands or nothing does - partial
    /// application must never be observable.
    async fn apply_transition(
        &self,
        change: DataSourceChange,
        sync: StatusSync,
    ) -> Result<(), StoreError>;
}

/// Cached LLM decomposition, keyed by the query+context hash.
#[derive(Debug, Clone)]
pub struct DecompositionCacheEntry {
    pub query_hash: String,
    pub original_query: String,
    pub context: SearchContext,
    pub decomposition: QueryDecomposition,
    pub hit_count: i64,
    pub first_created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait DecompositionCacheStore: Send + Sync {
    /// Fetch an entry regardless of expiry; the cache layer decides freshness.
    async fn get(&self, query_hash: &str) -> Result<Option<DecompositionCacheEntry>, StoreError>;

    /// Insert or overwrite the entry for its hash.
    async fn upsert(&self, entry: &DecompositionCacheEntry) -> Result<(), StoreError>;

    /// Bump hit_count and last_used_at. Returns false if the entry vanished.
    async fn record_hit(&self, query_hash: &str) -> Result<bool, StoreError>;

    /// Drop entries whose expires_at is in the past. Returns how many.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}
