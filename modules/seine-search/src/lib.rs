//! Dedup + cross-search aggregation engine.
//!
//! Content fetched through the external backend is deduplicated by content
//! fingerprint into a global result store; a mapping table records which
//! execution found what, at what rank. On top of that sit the multi-query
//! orchestrator (LLM decomposition, bounded-concurrency fan-out, composite
//! scoring) and the curation workflow (draft/confirm with status sync).

pub mod aggregate;
pub mod backend;
pub mod curation;
pub mod decompose;
pub mod executor;
pub mod fingerprint;
pub mod orchestrator;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod boundary_tests;

pub use aggregate::{Aggregation, ResultAggregator};
pub use backend::{FirecrawlBackend, LlmDecomposer};
pub use curation::CurationWorkflow;
pub use decompose::{CacheError, DecompositionService, QueryDecompositionCache};
pub use executor::{SearchExecutionCoordinator, SearchRequest};
pub use orchestrator::{
    AggregatedView, AggregationOrchestrator, DecomposeRequest, QueryGroup, ViewMode,
    DEFAULT_MAX_CONCURRENT_SEARCHES,
};
pub use store::{MemoryStore, PgStore};
