//! Cross-search aggregation: group results by content fingerprint, score
//! each group, rank deterministically.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use seine_common::{
    AggregatedResult, AggregationStats, ExecutionStatus, FetchedResult, ResultStatus, SearchTask,
    SeineError, SourceRef,
};

use crate::store::{AggregateStore, MappingStore};

/// Output of one aggregation run: ranked results plus run-level stats.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub stats: AggregationStats,
    pub results: Vec<AggregatedResult>,
}

struct Entry {
    query: String,
    sub_task_id: Uuid,
    position: i32,
    relevance_score: f64,
    result: FetchedResult,
}

pub struct ResultAggregator {
    mappings: Arc<dyn MappingStore>,
    aggregates: Arc<dyn AggregateStore>,
}

impl ResultAggregator {
    pub fn new(mappings: Arc<dyn MappingStore>, aggregates: Arc<dyn AggregateStore>) -> Self {
        Self {
            mappings,
            aggregates,
        }
    }

    /// Aggregate all completed sub-searches of one orchestration run and
    /// persist the ranked output. Run once per task, after every sub-search
    /// has returned.
    pub async fn aggregate(
        &self,
        parent_task_id: Uuid,
        sub_tasks: &[SearchTask],
    ) -> Result<Aggregation, SeineError> {
        let total_searches = sub_tasks.len() as i64;
        let mut successful_searches = 0;
        let mut failed_searches = 0;
        let mut total_credits_used = 0;
        let mut entries: Vec<Entry> = Vec::new();

        for task in sub_tasks {
            if task.status != ExecutionStatus::Completed {
                failed_searches += 1;
                continue;
            }
            successful_searches += 1;
            total_credits_used += task.credits_used;

            let query = task
                .query
                .clone()
                .or_else(|| task.crawl_url.clone())
                .unwrap_or_default();

            for (mapping, result) in self
                .mappings
                .all_results_by_execution(task.search_execution_id)
                .await?
            {
                entries.push(Entry {
                    query: query.clone(),
                    sub_task_id: task.id,
                    position: mapping.search_position,
                    relevance_score: mapping.relevance_score,
                    result,
                });
            }
        }

        let total_results_raw = entries.len() as i64;

        // Group by fingerprint, keeping insertion order inside each group so
        // the first-seen entry is the representative.
        let mut groups: HashMap<String, Vec<Entry>> = HashMap::new();
        for entry in entries {
            groups
                .entry(entry.result.content_fingerprint.clone())
                .or_default()
                .push(entry);
        }
        let total_results_deduplicated = groups.len() as i64;

        let mut results: Vec<AggregatedResult> = groups
            .into_values()
            .map(|group| scored_group(parent_task_id, group, total_searches as usize))
            .collect();

        // Deterministic ranking: score descending, then earliest discovery,
        // then id. Never rely on sort stability.
        results.sort_by(|a, b| {
            b.composite_score
                .total_cmp(&a.composite_score)
                .then_with(|| a.first_found_at.cmp(&b.first_found_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let duplication_rate = if total_results_raw > 0 {
            round2((total_results_raw - total_results_deduplicated) as f64 / total_results_raw as f64)
        } else {
            0.0
        };

        let stats = AggregationStats {
            total_searches,
            successful_searches,
            failed_searches,
            total_results_raw,
            total_results_deduplicated,
            duplication_rate,
            total_credits_used,
        };

        self.aggregates
            .replace_for_task(parent_task_id, &results)
            .await?;

        info!(
            parent_task = %parent_task_id,
            raw = total_results_raw,
            deduplicated = total_results_deduplicated,
            duplication_rate,
            "Aggregation complete"
        );

        Ok(Aggregation { stats, results })
    }

    /// Page through a persisted aggregation, best score first.
    pub async fn combined_view(
        &self,
        parent_task_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<AggregatedResult>, u64), SeineError> {
        Ok(self
            .aggregates
            .list_by_task(parent_task_id, page, page_size)
            .await?)
    }

    /// Drop a task's aggregation output (used when the parent task goes away).
    pub async fn delete_for_task(&self, parent_task_id: Uuid) -> Result<u64, SeineError> {
        Ok(self.aggregates.delete_by_task(parent_task_id).await?)
    }
}

fn scored_group(parent_task_id: Uuid, group: Vec<Entry>, total_queries: usize) -> AggregatedResult {
    let sources: Vec<SourceRef> = group
        .iter()
        .map(|e| SourceRef {
            query: e.query.clone(),
            sub_task_id: e.sub_task_id,
            position: e.position,
            relevance_score: e.relevance_score,
        })
        .collect();

    let positions: Vec<i32> = group.iter().map(|e| e.position).collect();
    let relevance: Vec<f64> = group.iter().map(|e| e.relevance_score).collect();
    let score = composite_score(sources.len(), &positions, &relevance, total_queries);

    let representative = &group[0].result;
    let source_count = sources.len() as i64;

    AggregatedResult {
        id: Uuid::now_v7(),
        parent_task_id,
        result_id: representative.id,
        title: representative.title.clone(),
        url: representative.url.clone(),
        snippet: representative.snippet.clone(),
        content_fingerprint: representative.content_fingerprint.clone(),
        composite_score: score,
        multi_source_bonus: source_count > 1,
        source_count,
        sources,
        status: ResultStatus::Pending,
        first_found_at: representative.first_found_at,
        created_at: chrono::Utc::now(),
    }
}

/// Composite score:
///   0.4 * multi_source_score + 0.4 * avg_relevance + 0.2 * position_score
/// where multi_source_score = appearances / total confirmed sub-queries
/// (failed ones included in the denominator), and
/// position_score = 1 / (1 + avg_position). Rounded to 4 decimal places.
pub fn composite_score(
    source_count: usize,
    positions: &[i32],
    relevance_scores: &[f64],
    total_queries: usize,
) -> f64 {
    let multi_source_score = source_count as f64 / total_queries.max(1) as f64;

    let avg_relevance = if relevance_scores.is_empty() {
        0.0
    } else {
        relevance_scores.iter().sum::<f64>() / relevance_scores.len() as f64
    };

    let avg_position = if positions.is_empty() {
        1.0
    } else {
        positions.iter().map(|p| f64::from(*p)).sum::<f64>() / positions.len() as f64
    };
    let position_score = 1.0 / (1.0 + avg_position);

    round4(0.4 * multi_source_score + 0.4 * avg_relevance + 0.2 * position_score)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_source_mid_rank() {
        // 0.4 * (1/2) + 0.4 * 1.0 + 0.2 * (1 / (1 + 1)) = 0.7
        let score = composite_score(1, &[1], &[1.0], 2);
        assert_eq!(score, 0.7);
    }

    #[test]
    fn full_agreement_scores_highest() {
        let three_way = composite_score(3, &[1, 1, 1], &[1.0, 1.0, 1.0], 3);
        let one_way = composite_score(1, &[1], &[1.0], 3);
        assert!(three_way > one_way);
    }

    #[test]
    fn score_is_bounded() {
        for (count, positions, relevance, total) in [
            (1usize, vec![1], vec![0.0], 1usize),
            (1, vec![50], vec![0.5], 5),
            (5, vec![1, 2, 3, 4, 5], vec![1.0; 5], 5),
            (2, vec![10, 20], vec![0.9, 0.1], 4),
        ] {
            let score = composite_score(count, &positions, &relevance, total);
            assert!((0.0..=1.0).contains(&score), "score {score} out of bounds");
        }
    }

    #[test]
    fn score_is_rounded_to_four_places() {
        let score = composite_score(1, &[2], &[0.3333], 3);
        assert_eq!(score, (score * 10_000.0).round() / 10_000.0);
    }

    #[test]
    fn deeper_ranks_score_lower() {
        let shallow = composite_score(1, &[1], &[0.5], 2);
        let deep = composite_score(1, &[9], &[0.5], 2);
        assert!(shallow > deep);
    }
}
