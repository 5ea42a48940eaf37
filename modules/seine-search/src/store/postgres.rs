//! Postgres persistence. Uniqueness constraints enforce the dedup
//! invariants; `found_count = found_count + 1` is the atomic increment;
//! curation transitions run inside real transactions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use seine_common::{
    AggregatedResult, DataSource, DiscoveryMapping, ExecutionStatus, FetchedResult,
    OrchestrationTask, QueryDecomposition, ResultStatus, SearchTask, StoreError,
};

use super::{
    AggregateStore, CurationStore, DataSourceChange, DecompositionCacheEntry,
    DecompositionCacheStore, MappedResult, MappingStore, OrchestrationStore, ResultStore,
    StatusSync, TaskStore,
};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(map_err)?;
        Ok(Self { pool })
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::DuplicateKey(db.message().to_string());
        }
    }
    StoreError::Database(e.to_string())
}

fn parse_status<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T, StoreError> {
    raw.parse().map_err(StoreError::Database)
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Database(e.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Database(e.to_string()))
}

fn offset(page: u32, page_size: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(page_size.max(1))
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct FetchedResultRow {
    id: Uuid,
    task_id: Uuid,
    title: String,
    url: String,
    url_normalized: String,
    snippet: Option<String>,
    markdown_content: Option<String>,
    html_content: Option<String>,
    content_fingerprint: String,
    source: String,
    relevance_score: f64,
    metadata: Option<serde_json::Value>,
    status: String,
    first_found_at: DateTime<Utc>,
    last_found_at: DateTime<Utc>,
    found_count: i64,
    unique_search_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FetchedResultRow> for FetchedResult {
    type Error = StoreError;

    fn try_from(row: FetchedResultRow) -> Result<Self, StoreError> {
        Ok(FetchedResult {
            id: row.id,
            task_id: row.task_id,
            title: row.title,
            url: row.url,
            url_normalized: row.url_normalized,
            snippet: row.snippet,
            markdown_content: row.markdown_content,
            html_content: row.html_content,
            content_fingerprint: row.content_fingerprint,
            source: row.source,
            relevance_score: row.relevance_score,
            metadata: row.metadata.unwrap_or(serde_json::Value::Null),
            status: parse_status(&row.status)?,
            first_found_at: row.first_found_at,
            last_found_at: row.last_found_at,
            found_count: row.found_count,
            unique_search_count: row.unique_search_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MappingRow {
    id: Uuid,
    search_execution_id: Uuid,
    result_id: Uuid,
    task_id: Uuid,
    search_position: i32,
    relevance_score: f64,
    is_first_discovery: bool,
    found_at: DateTime<Utc>,
}

impl From<MappingRow> for DiscoveryMapping {
    fn from(row: MappingRow) -> Self {
        DiscoveryMapping {
            id: row.id,
            search_execution_id: row.search_execution_id,
            result_id: row.result_id,
            task_id: row.task_id,
            search_position: row.search_position,
            relevance_score: row.relevance_score,
            is_first_discovery: row.is_first_discovery,
            found_at: row.found_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SearchTaskRow {
    id: Uuid,
    name: String,
    query: Option<String>,
    crawl_url: Option<String>,
    search_execution_id: Uuid,
    config: serde_json::Value,
    status: String,
    total_results: i64,
    new_results: i64,
    shared_results: i64,
    credits_used: i64,
    execution_time_ms: i64,
    error_message: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SearchTaskRow> for SearchTask {
    type Error = StoreError;

    fn try_from(row: SearchTaskRow) -> Result<Self, StoreError> {
        Ok(SearchTask {
            id: row.id,
            name: row.name,
            query: row.query,
            crawl_url: row.crawl_url,
            search_execution_id: row.search_execution_id,
            config: from_json(row.config)?,
            status: parse_status(&row.status)?,
            total_results: row.total_results,
            new_results: row.new_results,
            shared_results: row.shared_results,
            credits_used: row.credits_used,
            execution_time_ms: row.execution_time_ms,
            error_message: row.error_message,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrchestrationTaskRow {
    id: Uuid,
    name: String,
    original_query: String,
    config: serde_json::Value,
    sub_queries: serde_json::Value,
    llm_model: String,
    overall_strategy: String,
    decomposition_tokens: i64,
    confirmed_queries: serde_json::Value,
    confirmed_at: Option<DateTime<Utc>>,
    user_modifications: Option<serde_json::Value>,
    sub_task_ids: serde_json::Value,
    sub_search_outcomes: serde_json::Value,
    stats: Option<serde_json::Value>,
    status: String,
    error_message: Option<String>,
    execution_time_ms: i64,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrchestrationTaskRow> for OrchestrationTask {
    type Error = StoreError;

    fn try_from(row: OrchestrationTaskRow) -> Result<Self, StoreError> {
        Ok(OrchestrationTask {
            id: row.id,
            name: row.name,
            original_query: row.original_query,
            config: from_json(row.config)?,
            sub_queries: from_json(row.sub_queries)?,
            llm_model: row.llm_model,
            overall_strategy: row.overall_strategy,
            decomposition_tokens: row.decomposition_tokens,
            confirmed_queries: from_json(row.confirmed_queries)?,
            confirmed_at: row.confirmed_at,
            user_modifications: row.user_modifications.map(from_json).transpose()?,
            sub_task_ids: from_json(row.sub_task_ids)?,
            sub_search_outcomes: from_json(row.sub_search_outcomes)?,
            stats: row.stats.map(from_json).transpose()?,
            status: parse_status(&row.status)?,
            error_message: row.error_message,
            execution_time_ms: row.execution_time_ms,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AggregatedResultRow {
    id: Uuid,
    parent_task_id: Uuid,
    result_id: Uuid,
    title: String,
    url: String,
    snippet: Option<String>,
    content_fingerprint: String,
    composite_score: f64,
    sources: serde_json::Value,
    source_count: i64,
    multi_source_bonus: bool,
    status: String,
    first_found_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AggregatedResultRow> for AggregatedResult {
    type Error = StoreError;

    fn try_from(row: AggregatedResultRow) -> Result<Self, StoreError> {
        Ok(AggregatedResult {
            id: row.id,
            parent_task_id: row.parent_task_id,
            result_id: row.result_id,
            title: row.title,
            url: row.url,
            snippet: row.snippet,
            content_fingerprint: row.content_fingerprint,
            composite_score: row.composite_score,
            sources: from_json(row.sources)?,
            source_count: row.source_count,
            multi_source_bonus: row.multi_source_bonus,
            status: parse_status(&row.status)?,
            first_found_at: row.first_found_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DataSourceRow {
    id: Uuid,
    title: String,
    description: String,
    tags: serde_json::Value,
    status: String,
    raw_data_refs: serde_json::Value,
    total_raw_data_count: i64,
    scheduled_data_count: i64,
    instant_data_count: i64,
    edited_content: Option<String>,
    content_version: i64,
    confirmed_by: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    created_by: String,
    updated_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DataSourceRow> for DataSource {
    type Error = StoreError;

    fn try_from(row: DataSourceRow) -> Result<Self, StoreError> {
        Ok(DataSource {
            id: row.id,
            title: row.title,
            description: row.description,
            tags: from_json(row.tags)?,
            status: parse_status(&row.status)?,
            raw_data_refs: from_json(row.raw_data_refs)?,
            total_raw_data_count: row.total_raw_data_count,
            scheduled_data_count: row.scheduled_data_count,
            instant_data_count: row.instant_data_count,
            edited_content: row.edited_content,
            content_version: row.content_version,
            confirmed_by: row.confirmed_by,
            confirmed_at: row.confirmed_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CacheRow {
    query_hash: String,
    original_query: String,
    context: serde_json::Value,
    decomposition: serde_json::Value,
    hit_count: i64,
    first_created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<CacheRow> for DecompositionCacheEntry {
    type Error = StoreError;

    fn try_from(row: CacheRow) -> Result<Self, StoreError> {
        let decomposition: QueryDecomposition = from_json(row.decomposition)?;
        Ok(DecompositionCacheEntry {
            query_hash: row.query_hash,
            original_query: row.original_query,
            context: from_json(row.context)?,
            decomposition,
            hit_count: row.hit_count,
            first_created_at: row.first_created_at,
            last_used_at: row.last_used_at,
            expires_at: row.expires_at,
        })
    }
}

// ---------------------------------------------------------------------------
// ResultStore
// ---------------------------------------------------------------------------

#[async_trait]
impl ResultStore for PgStore {
    async fn create(&self, result: &FetchedResult) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO fetched_results
                (id, task_id, title, url, url_normalized, snippet,
                 markdown_content, html_content, content_fingerprint, source,
                 relevance_score, metadata, status, first_found_at, last_found_at,
                 found_count, unique_search_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(result.id)
        .bind(result.task_id)
        .bind(&result.title)
        .bind(&result.url)
        .bind(&result.url_normalized)
        .bind(&result.snippet)
        .bind(&result.markdown_content)
        .bind(&result.html_content)
        .bind(&result.content_fingerprint)
        .bind(&result.source)
        .bind(result.relevance_score)
        .bind(&result.metadata)
        .bind(result.status.as_str())
        .bind(result.first_found_at)
        .bind(result.last_found_at)
        .bind(result.found_count)
        .bind(result.unique_search_count)
        .bind(result.created_at)
        .bind(result.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FetchedResult>, StoreError> {
        let row = sqlx::query_as::<_, FetchedResultRow>(
            "SELECT * FROM fetched_results WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<FetchedResult>, StoreError> {
        let row = sqlx::query_as::<_, FetchedResultRow>(
            "SELECT * FROM fetched_results WHERE content_fingerprint = $1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn increment_discovery_stats(&self, result_id: Uuid) -> Result<bool, StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE fetched_results
            SET last_found_at = NOW(),
                found_count = found_count + 1,
                unique_search_count = unique_search_count + 1,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(result_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(done.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        result_id: Uuid,
        status: ResultStatus,
    ) -> Result<bool, StoreError> {
        let done = sqlx::query(
            "UPDATE fetched_results SET status = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(result_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(done.rows_affected() > 0)
    }

    async fn bulk_update_status(
        &self,
        ids: &[Uuid],
        status: ResultStatus,
    ) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let done = sqlx::query(
            "UPDATE fetched_results SET status = $1, updated_at = NOW() WHERE id = ANY($2)",
        )
        .bind(status.as_str())
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(done.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// MappingStore
// ---------------------------------------------------------------------------

#[async_trait]
impl MappingStore for PgStore {
    async fn create(&self, mapping: &DiscoveryMapping) -> Result<(), StoreError> {
        insert_mapping(&self.pool, mapping, false).await?;
        Ok(())
    }

    async fn batch_create(&self, mappings: &[DiscoveryMapping]) -> Result<usize, StoreError> {
        let mut skipped = 0;
        for mapping in mappings {
            if !insert_mapping(&self.pool, mapping, true).await? {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!(
                total = mappings.len(),
                skipped,
                "Batch mapping insert skipped duplicate pairs"
            );
        }
        Ok(skipped)
    }

    async fn results_by_execution(
        &self,
        execution_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<MappedResult>, u64), StoreError> {
        let rows = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT * FROM discovery_mappings
            WHERE search_execution_id = $1
            ORDER BY search_position ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(execution_id)
        .bind(i64::from(page_size.max(1)))
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM discovery_mappings WHERE search_execution_id = $1",
        )
        .bind(execution_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;

        let joined = self.join_results(rows).await?;
        Ok((joined, total as u64))
    }

    async fn all_results_by_execution(
        &self,
        execution_id: Uuid,
    ) -> Result<Vec<MappedResult>, StoreError> {
        let rows = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT * FROM discovery_mappings
            WHERE search_execution_id = $1
            ORDER BY search_position ASC
            "#,
        )
        .bind(execution_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        self.join_results(rows).await
    }

    async fn mappings_by_result(
        &self,
        result_id: Uuid,
    ) -> Result<Vec<DiscoveryMapping>, StoreError> {
        let rows = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT * FROM discovery_mappings
            WHERE result_id = $1
            ORDER BY found_at DESC
            "#,
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Insert one mapping. With `tolerate_duplicate`, a conflicting
/// (execution, result) pair is skipped and reported as `false`.
async fn insert_mapping(
    pool: &PgPool,
    mapping: &DiscoveryMapping,
    tolerate_duplicate: bool,
) -> Result<bool, StoreError> {
    let conflict_clause = if tolerate_duplicate {
        "ON CONFLICT (search_execution_id, result_id) DO NOTHING"
    } else {
        ""
    };
    let sql = format!(
        r#"
        INSERT INTO discovery_mappings
            (id, search_execution_id, result_id, task_id, search_position,
             relevance_score, is_first_discovery, found_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        {conflict_clause}
        "#,
    );
    let done = sqlx::query(&sql)
        .bind(mapping.id)
        .bind(mapping.search_execution_id)
        .bind(mapping.result_id)
        .bind(mapping.task_id)
        .bind(mapping.search_position)
        .bind(mapping.relevance_score)
        .bind(mapping.is_first_discovery)
        .bind(mapping.found_at)
        .execute(pool)
        .await
        .map_err(map_err)?;
    Ok(done.rows_affected() > 0)
}

impl PgStore {
    async fn join_results(&self, rows: Vec<MappingRow>) -> Result<Vec<MappedResult>, StoreError> {
        let ids: Vec<Uuid> = rows.iter().map(|m| m.result_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result_rows = sqlx::query_as::<_, FetchedResultRow>(
            "SELECT * FROM fetched_results WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let mut by_id = std::collections::HashMap::with_capacity(result_rows.len());
        for row in result_rows {
            let result: FetchedResult = row.try_into()?;
            by_id.insert(result.id, result);
        }

        Ok(rows
            .into_iter()
            .filter_map(|m| {
                by_id
                    .get(&m.result_id)
                    .cloned()
                    .map(|r| (DiscoveryMapping::from(m), r))
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// TaskStore
// ---------------------------------------------------------------------------

#[async_trait]
impl TaskStore for PgStore {
    async fn insert(&self, task: &SearchTask) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO search_tasks
                (id, name, query, crawl_url, search_execution_id, config, status,
                 total_results, new_results, shared_results, credits_used,
                 execution_time_ms, error_message, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(task.id)
        .bind(&task.name)
        .bind(&task.query)
        .bind(&task.crawl_url)
        .bind(task.search_execution_id)
        .bind(to_json(&task.config)?)
        .bind(task.status.as_str())
        .bind(task.total_results)
        .bind(task.new_results)
        .bind(task.shared_results)
        .bind(task.credits_used)
        .bind(task.execution_time_ms)
        .bind(&task.error_message)
        .bind(&task.created_by)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SearchTask>, StoreError> {
        let row = sqlx::query_as::<_, SearchTaskRow>("SELECT * FROM search_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, task: &SearchTask) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE search_tasks
            SET status = $2, total_results = $3, new_results = $4,
                shared_results = $5, credits_used = $6, execution_time_ms = $7,
                error_message = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(task.status.as_str())
        .bind(task.total_results)
        .bind(task.new_results)
        .bind(task.shared_results)
        .bind(task.credits_used)
        .bind(task.execution_time_ms)
        .bind(&task.error_message)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn list(
        &self,
        page: u32,
        page_size: u32,
        status: Option<ExecutionStatus>,
    ) -> Result<(Vec<SearchTask>, u64), StoreError> {
        let status_str = status.map(|s| s.as_str());
        let rows = sqlx::query_as::<_, SearchTaskRow>(
            r#"
            SELECT * FROM search_tasks
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status_str)
        .bind(i64::from(page_size.max(1)))
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM search_tasks WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status_str)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;

        let tasks = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((tasks, total as u64))
    }
}

// ---------------------------------------------------------------------------
// OrchestrationStore
// ---------------------------------------------------------------------------

#[async_trait]
impl OrchestrationStore for PgStore {
    async fn insert(&self, task: &OrchestrationTask) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orchestration_tasks
                (id, name, original_query, config, sub_queries, llm_model,
                 overall_strategy, decomposition_tokens, confirmed_queries,
                 confirmed_at, user_modifications, sub_task_ids,
                 sub_search_outcomes, stats, status, error_message,
                 execution_time_ms, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(task.id)
        .bind(&task.name)
        .bind(&task.original_query)
        .bind(to_json(&task.config)?)
        .bind(to_json(&task.sub_queries)?)
        .bind(&task.llm_model)
        .bind(&task.overall_strategy)
        .bind(task.decomposition_tokens)
        .bind(to_json(&task.confirmed_queries)?)
        .bind(task.confirmed_at)
        .bind(task.user_modifications.as_ref().map(to_json).transpose()?)
        .bind(to_json(&task.sub_task_ids)?)
        .bind(to_json(&task.sub_search_outcomes)?)
        .bind(task.stats.as_ref().map(to_json).transpose()?)
        .bind(task.status.as_str())
        .bind(&task.error_message)
        .bind(task.execution_time_ms)
        .bind(&task.created_by)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<OrchestrationTask>, StoreError> {
        let row = sqlx::query_as::<_, OrchestrationTaskRow>(
            "SELECT * FROM orchestration_tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn update(&self, task: &OrchestrationTask) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE orchestration_tasks
            SET sub_queries = $2, llm_model = $3, overall_strategy = $4,
                decomposition_tokens = $5, confirmed_queries = $6,
                confirmed_at = $7, user_modifications = $8, sub_task_ids = $9,
                sub_search_outcomes = $10, stats = $11, status = $12,
                error_message = $13, execution_time_ms = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(to_json(&task.sub_queries)?)
        .bind(&task.llm_model)
        .bind(&task.overall_strategy)
        .bind(task.decomposition_tokens)
        .bind(to_json(&task.confirmed_queries)?)
        .bind(task.confirmed_at)
        .bind(task.user_modifications.as_ref().map(to_json).transpose()?)
        .bind(to_json(&task.sub_task_ids)?)
        .bind(to_json(&task.sub_search_outcomes)?)
        .bind(task.stats.as_ref().map(to_json).transpose()?)
        .bind(task.status.as_str())
        .bind(&task.error_message)
        .bind(task.execution_time_ms)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AggregateStore
// ---------------------------------------------------------------------------

#[async_trait]
impl AggregateStore for PgStore {
    async fn replace_for_task(
        &self,
        parent_task_id: Uuid,
        results: &[AggregatedResult],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        sqlx::query("DELETE FROM aggregated_results WHERE parent_task_id = $1")
            .bind(parent_task_id)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;

        for result in results {
            sqlx::query(
                r#"
                INSERT INTO aggregated_results
                    (id, parent_task_id, result_id, title, url, snippet,
                     content_fingerprint, composite_score, sources, source_count,
                     multi_source_bonus, status, first_found_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(result.id)
            .bind(result.parent_task_id)
            .bind(result.result_id)
            .bind(&result.title)
            .bind(&result.url)
            .bind(&result.snippet)
            .bind(&result.content_fingerprint)
            .bind(result.composite_score)
            .bind(to_json(&result.sources)?)
            .bind(result.source_count)
            .bind(result.multi_source_bonus)
            .bind(result.status.as_str())
            .bind(result.first_found_at)
            .bind(result.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;
        Ok(())
    }

    async fn list_by_task(
        &self,
        parent_task_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<AggregatedResult>, u64), StoreError> {
        let rows = sqlx::query_as::<_, AggregatedResultRow>(
            r#"
            SELECT * FROM aggregated_results
            WHERE parent_task_id = $1
            ORDER BY composite_score DESC, first_found_at ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(parent_task_id)
        .bind(i64::from(page_size.max(1)))
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM aggregated_results WHERE parent_task_id = $1",
        )
        .bind(parent_task_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;

        let results = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((results, total as u64))
    }

    async fn delete_by_task(&self, parent_task_id: Uuid) -> Result<u64, StoreError> {
        let done = sqlx::query("DELETE FROM aggregated_results WHERE parent_task_id = $1")
            .bind(parent_task_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(done.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// CurationStore
// ---------------------------------------------------------------------------

#[async_trait]
impl CurationStore for PgStore {
    async fn insert(&self, data_source: &DataSource) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        upsert_data_source(&mut tx, data_source).await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<DataSource>, StoreError> {
        let row = sqlx::query_as::<_, DataSourceRow>("SELECT * FROM data_sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self, page: u32, page_size: u32) -> Result<(Vec<DataSource>, u64), StoreError> {
        let rows = sqlx::query_as::<_, DataSourceRow>(
            r#"
            SELECT * FROM data_sources
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page_size.max(1)))
        .bind(offset(page, page_size))
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM data_sources")
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;

        let sources = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((sources, total as u64))
    }

    async fn apply_transition(
        &self,
        change: DataSourceChange,
        sync: StatusSync,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;

        match &change {
            DataSourceChange::Upsert(ds) => upsert_data_source(&mut tx, ds).await?,
            DataSourceChange::Delete(id) => {
                sqlx::query("DELETE FROM data_sources WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_err)?;
            }
        }

        if !sync.ids.is_empty() {
            sqlx::query(
                "UPDATE fetched_results SET status = $1, updated_at = NOW() WHERE id = ANY($2)",
            )
            .bind(sync.status.as_str())
            .bind(&sync.ids)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;
        Ok(())
    }
}

async fn upsert_data_source(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ds: &DataSource,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO data_sources
            (id, title, description, tags, status, raw_data_refs,
             total_raw_data_count, scheduled_data_count, instant_data_count,
             edited_content, content_version, confirmed_by, confirmed_at,
             created_by, updated_by, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        ON CONFLICT (id) DO UPDATE SET
            title = EXCLUDED.title,
            description = EXCLUDED.description,
            tags = EXCLUDED.tags,
            status = EXCLUDED.status,
            raw_data_refs = EXCLUDED.raw_data_refs,
            total_raw_data_count = EXCLUDED.total_raw_data_count,
            scheduled_data_count = EXCLUDED.scheduled_data_count,
            instant_data_count = EXCLUDED.instant_data_count,
            edited_content = EXCLUDED.edited_content,
            content_version = EXCLUDED.content_version,
            confirmed_by = EXCLUDED.confirmed_by,
            confirmed_at = EXCLUDED.confirmed_at,
            updated_by = EXCLUDED.updated_by,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(ds.id)
    .bind(&ds.title)
    .bind(&ds.description)
    .bind(to_json(&ds.tags)?)
    .bind(ds.status.as_str())
    .bind(to_json(&ds.raw_data_refs)?)
    .bind(ds.total_raw_data_count)
    .bind(ds.scheduled_data_count)
    .bind(ds.instant_data_count)
    .bind(&ds.edited_content)
    .bind(ds.content_version)
    .bind(&ds.confirmed_by)
    .bind(ds.confirmed_at)
    .bind(&ds.created_by)
    .bind(&ds.updated_by)
    .bind(ds.created_at)
    .bind(ds.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(map_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// DecompositionCacheStore
// ---------------------------------------------------------------------------

#[async_trait]
impl DecompositionCacheStore for PgStore {
    async fn get(&self, query_hash: &str) -> Result<Option<DecompositionCacheEntry>, StoreError> {
        let row =
            sqlx::query_as::<_, CacheRow>("SELECT * FROM decomposition_cache WHERE query_hash = $1")
                .bind(query_hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_err)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn upsert(&self, entry: &DecompositionCacheEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO decomposition_cache
                (query_hash, original_query, context, decomposition, hit_count,
                 first_created_at, last_used_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (query_hash) DO UPDATE SET
                original_query = EXCLUDED.original_query,
                context = EXCLUDED.context,
                decomposition = EXCLUDED.decomposition,
                hit_count = EXCLUDED.hit_count,
                last_used_at = EXCLUDED.last_used_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&entry.query_hash)
        .bind(&entry.original_query)
        .bind(to_json(&entry.context)?)
        .bind(to_json(&entry.decomposition)?)
        .bind(entry.hit_count)
        .bind(entry.first_created_at)
        .bind(entry.last_used_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn record_hit(&self, query_hash: &str) -> Result<bool, StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE decomposition_cache
            SET hit_count = hit_count + 1, last_used_at = NOW()
            WHERE query_hash = $1
            "#,
        )
        .bind(query_hash)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(done.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let done = sqlx::query("DELETE FROM decomposition_cache WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(done.rows_affected())
    }
}
