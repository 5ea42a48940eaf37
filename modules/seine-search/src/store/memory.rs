//! In-memory store. One mutex guards all collections, which makes every
//! multi-document transition trivially atomic - the same guarantee the
//! Postgres store gets from real transactions.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use seine_common::{
    AggregatedResult, DataSource, DiscoveryMapping, ExecutionStatus, FetchedResult,
    OrchestrationTask, ResultStatus, SearchTask, StoreError,
};

use super::{
    AggregateStore, CurationStore, DataSourceChange, DecompositionCacheEntry,
    DecompositionCacheStore, MappedResult, MappingStore, OrchestrationStore, ResultStore,
    StatusSync, TaskStore,
};

#[derive(Default)]
struct Inner {
    results: HashMap<Uuid, FetchedResult>,
    fingerprints: HashMap<String, Uuid>,
    mappings: Vec<DiscoveryMapping>,
    mapping_pairs: HashSet<(Uuid, Uuid)>,
    tasks: HashMap<Uuid, SearchTask>,
    orchestrations: HashMap<Uuid, OrchestrationTask>,
    aggregates: HashMap<Uuid, Vec<AggregatedResult>>,
    data_sources: HashMap<Uuid, DataSource>,
    cache: HashMap<String, DecompositionCacheEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

fn page_bounds(len: usize, page: u32, page_size: u32) -> (usize, usize) {
    let page = page.max(1) as usize;
    let page_size = page_size.max(1) as usize;
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(len);
    (start.min(len), end)
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn create(&self, result: &FetchedResult) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner
            .fingerprints
            .contains_key(&result.content_fingerprint)
        {
            return Err(StoreError::DuplicateKey(format!(
                "content_fingerprint {}",
                result.content_fingerprint
            )));
        }
        inner
            .fingerprints
            .insert(result.content_fingerprint.clone(), result.id);
        inner.results.insert(result.id, result.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<FetchedResult>, StoreError> {
        Ok(self.lock().results.get(&id).cloned())
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<FetchedResult>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .fingerprints
            .get(fingerprint)
            .and_then(|id| inner.results.get(id))
            .cloned())
    }

    async fn increment_discovery_stats(&self, result_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.results.get_mut(&result_id) {
            Some(result) => {
                let now = Utc::now();
                result.last_found_at = now;
                result.found_count += 1;
                result.unique_search_count += 1;
                result.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_status(
        &self,
        result_id: Uuid,
        status: ResultStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.results.get_mut(&result_id) {
            Some(result) => {
                result.status = status;
                result.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn bulk_update_status(
        &self,
        ids: &[Uuid],
        status: ResultStatus,
    ) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let mut updated = 0;
        for id in ids {
            if let Some(result) = inner.results.get_mut(id) {
                result.status = status;
                result.updated_at = Utc::now();
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn create(&self, mapping: &DiscoveryMapping) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let pair = (mapping.search_execution_id, mapping.result_id);
        if !inner.mapping_pairs.insert(pair) {
            return Err(StoreError::DuplicateKey(format!(
                "mapping ({}, {})",
                pair.0, pair.1
            )));
        }
        inner.mappings.push(mapping.clone());
        Ok(())
    }

    async fn batch_create(&self, mappings: &[DiscoveryMapping]) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let mut skipped = 0;
        for mapping in mappings {
            let pair = (mapping.search_execution_id, mapping.result_id);
            if inner.mapping_pairs.insert(pair) {
                inner.mappings.push(mapping.clone());
            } else {
                skipped += 1;
            }
        }
        Ok(skipped)
    }

    async fn results_by_execution(
        &self,
        execution_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<MappedResult>, u64), StoreError> {
        let all = self.all_results_by_execution(execution_id).await?;
        let total = all.len() as u64;
        let (start, end) = page_bounds(all.len(), page, page_size);
        Ok((all[start..end].to_vec(), total))
    }

    async fn all_results_by_execution(
        &self,
        execution_id: Uuid,
    ) -> Result<Vec<MappedResult>, StoreError> {
        let inner = self.lock();
        let mut rows: Vec<MappedResult> = inner
            .mappings
            .iter()
            .filter(|m| m.search_execution_id == execution_id)
            .filter_map(|m| inner.results.get(&m.result_id).map(|r| (m.clone(), r.clone())))
            .collect();
        rows.sort_by_key(|(m, _)| m.search_position);
        Ok(rows)
    }

    async fn mappings_by_result(
        &self,
        result_id: Uuid,
    ) -> Result<Vec<DiscoveryMapping>, StoreError> {
        let inner = self.lock();
        let mut rows: Vec<DiscoveryMapping> = inner
            .mappings
            .iter()
            .filter(|m| m.result_id == result_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.found_at.cmp(&a.found_at));
        Ok(rows)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert(&self, task: &SearchTask) -> Result<(), StoreError> {
        self.lock().tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SearchTask>, StoreError> {
        Ok(self.lock().tasks.get(&id).cloned())
    }

    async fn update(&self, task: &SearchTask) -> Result<(), StoreError> {
        self.lock().tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn list(
        &self,
        page: u32,
        page_size: u32,
        status: Option<ExecutionStatus>,
    ) -> Result<(Vec<SearchTask>, u64), StoreError> {
        let inner = self.lock();
        let mut tasks: Vec<SearchTask> = inner
            .tasks
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = tasks.len() as u64;
        let (start, end) = page_bounds(tasks.len(), page, page_size);
        Ok((tasks[start..end].to_vec(), total))
    }
}

#[async_trait]
impl OrchestrationStore for MemoryStore {
    async fn insert(&self, task: &OrchestrationTask) -> Result<(), StoreError> {
        self.lock().orchestrations.insert(task.id, task.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<OrchestrationTask>, StoreError> {
        Ok(self.lock().orchestrations.get(&id).cloned())
    }

    async fn update(&self, task: &OrchestrationTask) -> Result<(), StoreError> {
        self.lock().orchestrations.insert(task.id, task.clone());
        Ok(())
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn replace_for_task(
        &self,
        parent_task_id: Uuid,
        results: &[AggregatedResult],
    ) -> Result<(), StoreError> {
        self.lock()
            .aggregates
            .insert(parent_task_id, results.to_vec());
        Ok(())
    }

    async fn list_by_task(
        &self,
        parent_task_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<AggregatedResult>, u64), StoreError> {
        let inner = self.lock();
        let all = inner
            .aggregates
            .get(&parent_task_id)
            .cloned()
            .unwrap_or_default();
        let total = all.len() as u64;
        let (start, end) = page_bounds(all.len(), page, page_size);
        Ok((all[start..end].to_vec(), total))
    }

    async fn delete_by_task(&self, parent_task_id: Uuid) -> Result<u64, StoreError> {
        Ok(self
            .lock()
            .aggregates
            .remove(&parent_task_id)
            .map(|rows| rows.len() as u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl CurationStore for MemoryStore {
    async fn insert(&self, data_source: &DataSource) -> Result<(), StoreError> {
        self.lock()
            .data_sources
            .insert(data_source.id, data_source.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<DataSource>, StoreError> {
        Ok(self.lock().data_sources.get(&id).cloned())
    }

    async fn list(&self, page: u32, page_size: u32) -> Result<(Vec<DataSource>, u64), StoreError> {
        let inner = self.lock();
        let mut sources: Vec<DataSource> = inner.data_sources.values().cloned().collect();
        sources.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = sources.len() as u64;
        let (start, end) = page_bounds(sources.len(), page, page_size);
        Ok((sources[start..end].to_vec(), total))
    }

    async fn apply_transition(
        &self,
        change: DataSourceChange,
        sync: StatusSync,
    ) -> Result<(), StoreError> {
        // One lock held across both writes - the whole transition is atomic.
        let mut inner = self.lock();
        match change {
            DataSourceChange::Upsert(ds) => {
                inner.data_sources.insert(ds.id, ds);
            }
            DataSourceChange::Delete(id) => {
                inner.data_sources.remove(&id);
            }
        }
        for id in &sync.ids {
            if let Some(result) = inner.results.get_mut(id) {
                result.status = sync.status;
                result.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DecompositionCacheStore for MemoryStore {
    async fn get(&self, query_hash: &str) -> Result<Option<DecompositionCacheEntry>, StoreError> {
        Ok(self.lock().cache.get(query_hash).cloned())
    }

    async fn upsert(&self, entry: &DecompositionCacheEntry) -> Result<(), StoreError> {
        self.lock()
            .cache
            .insert(entry.query_hash.clone(), entry.clone());
        Ok(())
    }

    async fn record_hit(&self, query_hash: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.cache.get_mut(query_hash) {
            Some(entry) => {
                entry.hit_count += 1;
                entry.last_used_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let before = inner.cache.len();
        inner.cache.retain(|_, e| e.expires_at > now);
        Ok((before - inner.cache.len()) as u64)
    }
}
