//! Query decomposition with a TTL cache in front of the LLM call.
//!
//! The cache is a cost optimization, never a correctness dependency: every
//! cache operation returns `Result<_, CacheError>` and the decomposition
//! service pattern-matches and ignores the error branch, falling back to
//! the LLM. A cache outage slows decomposition down; it cannot fail it.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use seine_common::{QueryDecomposition, SearchContext, SeineError};

use crate::store::{DecompositionCacheEntry, DecompositionCacheStore};
use crate::traits::Decomposer;

/// Cache-layer failure. Deliberately not part of the core error taxonomy -
/// it must never propagate past the decomposition service.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Store(String),
}

pub struct QueryDecompositionCache {
    store: Arc<dyn DecompositionCacheStore>,
    ttl_hours: i64,
}

impl QueryDecompositionCache {
    pub fn new(store: Arc<dyn DecompositionCacheStore>, ttl_hours: i64) -> Self {
        Self { store, ttl_hours }
    }

    /// Cache key: hash of the query plus every context dimension. The same
    /// query under a different context must miss.
    pub fn cache_key(query: &str, context: &SearchContext) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        hasher.update(b"|");
        hasher.update(context.target_domains.as_deref().unwrap_or_default());
        hasher.update(b"|");
        hasher.update(context.language.as_deref().unwrap_or_default());
        hasher.update(b"|");
        hasher.update(context.time_range.as_deref().unwrap_or_default());
        hex::encode(hasher.finalize())
    }

    /// Returns the cached decomposition, or None on miss or expiry.
    ///
    /// Hit bookkeeping (hit_count, last_used_at) is a best-effort side
    /// effect - a failed stat write never fails the read.
    pub async fn get(
        &self,
        query: &str,
        context: &SearchContext,
    ) -> Result<Option<QueryDecomposition>, CacheError> {
        let hash = Self::cache_key(query, context);
        let entry = self
            .store
            .get(&hash)
            .await
            .map_err(|e| CacheError::Store(e.to_string()))?;

        match entry {
            Some(entry) if entry.expires_at > Utc::now() => {
                if let Err(e) = self.store.record_hit(&hash).await {
                    debug!(query_hash = %hash, error = %e, "Cache hit bookkeeping failed");
                }
                debug!(query_hash = %hash, "Decomposition cache hit");
                Ok(Some(entry.decomposition))
            }
            Some(_) => {
                debug!(query_hash = %hash, "Decomposition cache entry expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Upsert: overwrites any existing entry for the same key and resets
    /// its TTL and hit count.
    pub async fn put(
        &self,
        query: &str,
        context: &SearchContext,
        decomposition: &QueryDecomposition,
    ) -> Result<(), CacheError> {
        let now = Utc::now();
        let entry = DecompositionCacheEntry {
            query_hash: Self::cache_key(query, context),
            original_query: query.to_string(),
            context: context.clone(),
            decomposition: decomposition.clone(),
            hit_count: 0,
            first_created_at: now,
            last_used_at: now,
            expires_at: now + Duration::hours(self.ttl_hours),
        };
        self.store
            .upsert(&entry)
            .await
            .map_err(|e| CacheError::Store(e.to_string()))
    }

    /// Drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        self.store
            .purge_expired()
            .await
            .map_err(|e| CacheError::Store(e.to_string()))
    }
}

/// Cache-fronted decomposition: check the cache, fall back to the LLM,
/// write the result back. LLM failures are hard; cache failures are not.
pub struct DecompositionService {
    decomposer: Arc<dyn Decomposer>,
    cache: QueryDecompositionCache,
}

impl DecompositionService {
    pub fn new(decomposer: Arc<dyn Decomposer>, cache: QueryDecompositionCache) -> Self {
        Self { decomposer, cache }
    }

    pub async fn decompose(
        &self,
        query: &str,
        context: &SearchContext,
    ) -> Result<QueryDecomposition, SeineError> {
        match self.cache.get(query, context).await {
            Ok(Some(decomposition)) => {
                info!(query, "Using cached decomposition");
                return Ok(decomposition);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(query, error = %e, "Decomposition cache read failed, calling LLM directly");
            }
        }

        let decomposition = self.decomposer.decompose(query, context).await?;

        if let Err(e) = self.cache.put(query, context, &decomposition).await {
            warn!(query, error = %e, "Decomposition cache write failed");
        }

        Ok(decomposition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use seine_common::SubQuery;

    fn decomposition() -> QueryDecomposition {
        QueryDecomposition {
            sub_queries: vec![SubQuery {
                query: "rust async runtimes".to_string(),
                reasoning: "core".to_string(),
                focus: "tech".to_string(),
            }],
            overall_strategy: "split".to_string(),
            model: "gpt-4o".to_string(),
            tokens_used: 120,
        }
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let store = Arc::new(MemoryStore::new());
        let cache = QueryDecompositionCache::new(store, 24);
        let ctx = SearchContext::default();

        assert!(cache.get("q", &ctx).await.unwrap().is_none());
        cache.put("q", &ctx, &decomposition()).await.unwrap();

        let hit = cache.get("q", &ctx).await.unwrap().unwrap();
        assert_eq!(hit.sub_queries.len(), 1);
    }

    #[tokio::test]
    async fn different_context_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let cache = QueryDecompositionCache::new(store, 24);
        let ctx = SearchContext::default();
        cache.put("q", &ctx, &decomposition()).await.unwrap();

        let other = SearchContext {
            language: Some("de".to_string()),
            ..SearchContext::default()
        };
        assert!(cache.get("q", &other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        // Zero-hour TTL: entries expire the moment they are written.
        let cache = QueryDecompositionCache::new(store.clone(), 0);
        let ctx = SearchContext::default();
        cache.put("q", &ctx, &decomposition()).await.unwrap();

        assert!(cache.get("q", &ctx).await.unwrap().is_none());
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn hits_are_counted() {
        let store = Arc::new(MemoryStore::new());
        let cache = QueryDecompositionCache::new(store.clone(), 24);
        let ctx = SearchContext::default();
        cache.put("q", &ctx, &decomposition()).await.unwrap();

        cache.get("q", &ctx).await.unwrap();
        cache.get("q", &ctx).await.unwrap();

        let hash = QueryDecompositionCache::cache_key("q", &ctx);
        let entry = crate::store::DecompositionCacheStore::get(store.as_ref(), &hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.hit_count, 2);
    }

    #[test]
    fn cache_key_is_context_sensitive() {
        let base = SearchContext::default();
        let with_domain = SearchContext {
            target_domains: Some("example.com".to_string()),
            ..SearchContext::default()
        };
        assert_ne!(
            QueryDecompositionCache::cache_key("q", &base),
            QueryDecompositionCache::cache_key("q", &with_domain)
        );
        assert_eq!(
            QueryDecompositionCache::cache_key("q", &base),
            QueryDecompositionCache::cache_key("q", &base)
        );
    }
}
