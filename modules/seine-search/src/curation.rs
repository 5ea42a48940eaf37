//! Curation workflow: build a data-source document out of raw results,
//! confirm it, revert it.
//!
//! Every transition pairs a data-source change with a raw-result status
//! sync and applies both through the store's single transactional
//! primitive. A half-applied transition is never observable.
//!
//! Status sync map:
//!   add      → raw result `processing`
//!   remove   → raw result `archived`
//!   confirm  → all referenced `completed`
//!   revert   → all referenced `processing`
//!   delete   → all referenced `archived` (drafts only; deleting a confirmed
//!              curation leaves its sources `completed`)

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use seine_common::{
    DataSource, DataSourceStatus, RawDataKind, RawDataRef, ResultStatus, SeineError,
};

use crate::store::{CurationStore, DataSourceChange, ResultStore, StatusSync};

pub struct CurationWorkflow {
    data_sources: Arc<dyn CurationStore>,
    results: Arc<dyn ResultStore>,
}

impl CurationWorkflow {
    pub fn new(data_sources: Arc<dyn CurationStore>, results: Arc<dyn ResultStore>) -> Self {
        Self {
            data_sources,
            results,
        }
    }

    pub async fn create_data_source(
        &self,
        title: &str,
        description: &str,
        created_by: &str,
        tags: Vec<String>,
    ) -> Result<DataSource, SeineError> {
        let data_source = DataSource::new(title, description, created_by, tags);
        self.data_sources.insert(&data_source).await?;
        info!(data_source = %data_source.id, title, "Data source created");
        Ok(data_source)
    }

    pub async fn get_data_source(&self, id: Uuid) -> Result<Option<DataSource>, SeineError> {
        Ok(self.data_sources.get(id).await?)
    }

    pub async fn list_data_sources(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<DataSource>, u64), SeineError> {
        Ok(self.data_sources.list(page, page_size).await?)
    }

    /// Update title/description/tags. Draft only.
    pub async fn update_info(
        &self,
        id: Uuid,
        title: Option<String>,
        description: Option<String>,
        tags: Option<Vec<String>>,
        updated_by: &str,
    ) -> Result<DataSource, SeineError> {
        let mut ds = self.editable(id).await?;
        if let Some(title) = title {
            ds.title = title;
        }
        if let Some(description) = description {
            ds.description = description;
        }
        if let Some(tags) = tags {
            ds.tags = tags;
        }
        ds.updated_by = updated_by.to_string();
        ds.updated_at = chrono::Utc::now();
        self.data_sources
            .apply_transition(DataSourceChange::Upsert(ds.clone()), StatusSync::none())
            .await?;
        Ok(ds)
    }

    /// Replace the draft's edited content, bumping the version. Draft only.
    pub async fn update_content(
        &self,
        id: Uuid,
        edited_content: String,
        updated_by: &str,
    ) -> Result<DataSource, SeineError> {
        let mut ds = self.editable(id).await?;
        ds.edited_content = Some(edited_content);
        ds.content_version += 1;
        ds.updated_by = updated_by.to_string();
        ds.updated_at = chrono::Utc::now();
        self.data_sources
            .apply_transition(DataSourceChange::Upsert(ds.clone()), StatusSync::none())
            .await?;
        Ok(ds)
    }

    /// Add a raw result to a draft. The result must currently be `pending`
    /// or `archived` - data already in progress elsewhere cannot be re-added.
    /// Raw status → `processing`, reference appended, counters recomputed,
    /// all in one transaction.
    pub async fn add_raw_data(
        &self,
        data_source_id: Uuid,
        data_id: Uuid,
        kind: RawDataKind,
        added_by: &str,
    ) -> Result<DataSource, SeineError> {
        let mut ds = self.editable(data_source_id).await?;

        if ds.raw_data_refs.iter().any(|r| r.data_id == data_id) {
            return Err(SeineError::ConfigValidation(format!(
                "raw data {data_id} is already referenced by this data source"
            )));
        }

        let raw = self
            .results
            .get(data_id)
            .await?
            .ok_or(SeineError::NotFound {
                entity: "raw result",
                id: data_id.to_string(),
            })?;

        if !matches!(raw.status, ResultStatus::Pending | ResultStatus::Archived) {
            return Err(SeineError::InvalidState {
                expected: "pending or archived".to_string(),
                actual: raw.status.to_string(),
            });
        }

        let snippet = raw.snippet.clone().unwrap_or_else(|| {
            raw.markdown_content
                .as_ref()
                .map(|m| m.chars().take(200).collect())
                .unwrap_or_default()
        });

        ds.add_ref(
            RawDataRef {
                data_id,
                kind,
                title: raw.title.clone(),
                url: raw.url.clone(),
                snippet,
                added_at: chrono::Utc::now(),
                added_by: added_by.to_string(),
            },
            added_by,
        );

        self.data_sources
            .apply_transition(
                DataSourceChange::Upsert(ds.clone()),
                StatusSync {
                    ids: vec![data_id],
                    status: ResultStatus::Processing,
                },
            )
            .await?;

        info!(
            data_source = %ds.id,
            data_id = %data_id,
            kind = %kind,
            "Raw data added to data source"
        );
        Ok(ds)
    }

    /// Remove a raw result from a draft. Raw status → `archived`.
    pub async fn remove_raw_data(
        &self,
        data_source_id: Uuid,
        data_id: Uuid,
        removed_by: &str,
    ) -> Result<DataSource, SeineError> {
        let mut ds = self.editable(data_source_id).await?;

        if !ds.remove_ref(data_id, removed_by) {
            return Err(SeineError::NotFound {
                entity: "raw data reference",
                id: data_id.to_string(),
            });
        }

        self.data_sources
            .apply_transition(
                DataSourceChange::Upsert(ds.clone()),
                StatusSync {
                    ids: vec![data_id],
                    status: ResultStatus::Archived,
                },
            )
            .await?;

        info!(data_source = %ds.id, data_id = %data_id, "Raw data removed from data source");
        Ok(ds)
    }

    /// draft → confirmed. Requires at least one referenced raw result; all
    /// referenced results become `completed`.
    pub async fn confirm(
        &self,
        data_source_id: Uuid,
        confirmed_by: &str,
    ) -> Result<DataSource, SeineError> {
        let mut ds = self.required(data_source_id).await?;
        if !ds.can_confirm() {
            return Err(SeineError::InvalidState {
                expected: "draft with at least one raw reference".to_string(),
                actual: format!("{} with {} references", ds.status, ds.total_raw_data_count),
            });
        }

        ds.confirm(confirmed_by);
        let ids = ds.raw_ids();
        self.data_sources
            .apply_transition(
                DataSourceChange::Upsert(ds.clone()),
                StatusSync {
                    ids,
                    status: ResultStatus::Completed,
                },
            )
            .await?;

        info!(
            data_source = %ds.id,
            references = ds.total_raw_data_count,
            "Data source confirmed"
        );
        Ok(ds)
    }

    /// confirmed → draft. Confirmation fields cleared; all referenced raw
    /// results go back to `processing`.
    pub async fn revert(
        &self,
        data_source_id: Uuid,
        reverted_by: &str,
    ) -> Result<DataSource, SeineError> {
        let mut ds = self.required(data_source_id).await?;
        if ds.status != DataSourceStatus::Confirmed {
            return Err(SeineError::InvalidState {
                expected: DataSourceStatus::Confirmed.to_string(),
                actual: ds.status.to_string(),
            });
        }

        ds.revert_to_draft(reverted_by);
        let ids = ds.raw_ids();
        self.data_sources
            .apply_transition(
                DataSourceChange::Upsert(ds.clone()),
                StatusSync {
                    ids,
                    status: ResultStatus::Processing,
                },
            )
            .await?;

        info!(data_source = %ds.id, "Data source reverted to draft");
        Ok(ds)
    }

    /// Delete from either state. Deleting a draft archives its referenced
    /// raw results; deleting a confirmed source leaves them `completed`.
    pub async fn delete(&self, data_source_id: Uuid, deleted_by: &str) -> Result<(), SeineError> {
        let ds = self.required(data_source_id).await?;

        let sync = if ds.status == DataSourceStatus::Draft {
            StatusSync {
                ids: ds.raw_ids(),
                status: ResultStatus::Archived,
            }
        } else {
            StatusSync::none()
        };

        self.data_sources
            .apply_transition(DataSourceChange::Delete(ds.id), sync)
            .await?;

        info!(
            data_source = %ds.id,
            status = %ds.status,
            deleted_by,
            "Data source deleted"
        );
        Ok(())
    }

    /// Bulk status update: any state → archived. No transaction needed -
    /// this touches only the results collection.
    pub async fn batch_archive_raw_data(
        &self,
        data_ids: &[Uuid],
        updated_by: &str,
    ) -> Result<u64, SeineError> {
        let updated = self
            .results
            .bulk_update_status(data_ids, ResultStatus::Archived)
            .await?;
        info!(requested = data_ids.len(), updated, updated_by, "Raw data batch archived");
        Ok(updated)
    }

    /// Bulk soft delete: any state → deleted. Rows are never physically
    /// removed.
    pub async fn batch_delete_raw_data(
        &self,
        data_ids: &[Uuid],
        deleted_by: &str,
    ) -> Result<u64, SeineError> {
        let updated = self
            .results
            .bulk_update_status(data_ids, ResultStatus::Deleted)
            .await?;
        info!(requested = data_ids.len(), updated, deleted_by, "Raw data batch deleted");
        Ok(updated)
    }

    async fn required(&self, id: Uuid) -> Result<DataSource, SeineError> {
        self.data_sources
            .get(id)
            .await?
            .ok_or(SeineError::NotFound {
                entity: "data source",
                id: id.to_string(),
            })
    }

    async fn editable(&self, id: Uuid) -> Result<DataSource, SeineError> {
        let ds = self.required(id).await?;
        if !ds.can_edit() {
            return Err(SeineError::InvalidState {
                expected: DataSourceStatus::Draft.to_string(),
                actual: ds.status.to_string(),
            });
        }
        Ok(ds)
    }
}
