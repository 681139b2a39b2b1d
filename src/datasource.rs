// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache + resilience composition for a datasource.
//!
//! A datasource holds one [`EntityCache`] and one [`ResilienceEngine`] and
//! delegates to them explicitly:
//!
//! ```text
//! fetch_by_id(op, id)
//!       │
//!       ├─→ cache hit "op:id" → return
//!       │
//!       └─→ miss → with_retry(backend) ──ok──→ cache.put("op:id") → return
//!                        │ err
//!                        └──→ NormalizedError (cache untouched)
//!
//! mutate(op, id)
//!       │
//!       └─→ with_retry(backend) ──ok──→ invalidate "*:id" + "*:query:*"
//! ```
//!
//! Concurrent misses on the same key are not coalesced; each runs its own
//! backend call and the last write wins.

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, trace};

use crate::cache::keys::{build_entity_key, build_query_key};
use crate::cache::EntityCache;
use crate::config::{ConfigError, DatasourceConfig};
use crate::resilience::{BatchOutcome, ErrorTranslator, NormalizedError, RawError, ResilienceEngine};

/// Segment marking list/search result keys (`operation:query:...`)
const QUERY_SEGMENT: &str = "query";

pub struct CachedDatasource<V> {
    cache: EntityCache<V>,
    resilience: ResilienceEngine,
}

impl<V> CachedDatasource<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Build from config and the backend's error translator.
    pub fn new(config: DatasourceConfig, translator: ErrorTranslator) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            cache: EntityCache::new(config.cache),
            resilience: ResilienceEngine::new(translator, config.retry),
        })
    }

    pub fn from_parts(cache: EntityCache<V>, resilience: ResilienceEngine) -> Self {
        Self { cache, resilience }
    }

    #[must_use]
    pub fn cache(&self) -> &EntityCache<V> {
        &self.cache
    }

    #[must_use]
    pub fn resilience(&self) -> &ResilienceEngine {
        &self.resilience
    }

    /// Cached single-entity read keyed `operation:id`.
    pub async fn fetch_by_id<F, Fut, E>(
        &self,
        operation: &str,
        id: &str,
        fetch: F,
    ) -> Result<V, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Into<RawError>,
    {
        let key = build_entity_key(operation, id);
        self.read_through(operation, key, fetch).await
    }

    /// Cached list/search read keyed by the sorted query parameters.
    pub async fn fetch_query<I, K, P, F, Fut, E>(
        &self,
        operation: &str,
        params: I,
        fetch: F,
    ) -> Result<V, NormalizedError>
    where
        I: IntoIterator<Item = (K, P)>,
        K: AsRef<str>,
        P: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Into<RawError>,
    {
        let key = build_query_key(operation, params);
        self.read_through(operation, key, fetch).await
    }

    /// Cached reads for many ids; one failing id never aborts the others.
    pub async fn fetch_many<F, Fut, E>(
        &self,
        operation: &str,
        ids: &[&str],
        fetch: F,
    ) -> BatchOutcome<V>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Into<RawError>,
    {
        let fetch = &fetch;
        let reads = ids.iter().map(|&id| {
            self.fetch_by_id(operation, id, move || fetch(id.to_string()))
        });
        self.resilience.with_batch_error_handling(operation, reads).await
    }

    /// Run a write through the retry engine; on success drop every cached
    /// entry for `id` plus every list/search result.
    pub async fn mutate<F, Fut, R, E>(
        &self,
        operation: &str,
        id: &str,
        write: F,
    ) -> Result<R, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Into<RawError>,
    {
        let result = self.resilience.with_retry(operation, write).await?;

        let entity = self.cache.invalidate_for_entity(id);
        let queries = self.invalidate_queries();
        debug!(operation, id, entity, queries, "Invalidated after mutation");

        Ok(result)
    }

    /// Drop every list/search result (`operation:query:...` keys).
    pub fn invalidate_queries(&self) -> usize {
        self.cache
            .invalidate_if(|key| key.split(':').nth(1) == Some(QUERY_SEGMENT))
    }

    /// Tear down the cache (entries + timer). Idempotent.
    pub fn dispose(&self) {
        self.cache.dispose();
    }

    async fn read_through<F, Fut, E>(
        &self,
        operation: &str,
        key: String,
        fetch: F,
    ) -> Result<V, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Into<RawError>,
    {
        if let Some(value) = self.cache.get(&key) {
            trace!(key = %key, "Cache hit");
            return Ok(value);
        }

        let value = self.resilience.with_retry(operation, fetch).await?;
        self.cache.put(key, value.clone());
        Ok(value)
    }
}
