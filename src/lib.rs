//! # Datasource Core
//!
//! Caching and error-resilience building blocks shared by datasource
//! implementations (REST clients, document stores, ...).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CachedDatasource<V>                      │
//! │  • fetch_by_id / fetch_query: cache first, then backend     │
//! │  • mutate: write, then invalidate entity + query results    │
//! │  • fetch_many: per-id isolation via batch aggregation       │
//! └─────────────────────────────────────────────────────────────┘
//!                │                               │
//!                ▼                               ▼
//! ┌──────────────────────────────┐ ┌──────────────────────────────┐
//! │        EntityCache<V>        │ │       ResilienceEngine       │
//! │  • TTL entries, lazy expiry  │ │  • ErrorTranslator tables    │
//! │  • Oldest-first batch evict  │ │  • Bounded exponential retry │
//! │  • Regex / entity invalidate │ │  • Batch error aggregation   │
//! │  • Background sweep task     │ │                              │
//! └──────────────────────────────┘ └──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use datasource_core::{CacheConfig, EntityCache};
//! use std::time::Duration;
//!
//! let cache: EntityCache<String> = EntityCache::new(CacheConfig::named("users", 100));
//!
//! cache.put_with_ttl("getById:42", "alice".to_string(), Some(Duration::from_secs(300)));
//! cache.put("getAll:query:limit=10", "[...]".to_string());
//!
//! // Drop every list result, keep the entity
//! let removed = cache.invalidate_by_pattern("getAll:.*").unwrap();
//! assert_eq!(removed, 1);
//! assert_eq!(cache.get("getById:42").as_deref(), Some("alice"));
//! ```
//!
//! Wrapping a backend call with retry and error normalization:
//!
//! ```rust
//! use datasource_core::{ErrorKind, RawError, ResilienceEngine, RetryPolicy};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = ResilienceEngine::rest().with_policy(RetryPolicy::none());
//!
//! let err = engine
//!     .with_retry("getById", || async {
//!         Err::<(), _>(RawError::status(404, "no such user"))
//!     })
//!     .await
//!     .unwrap_err();
//!
//! assert_eq!(err.kind, ErrorKind::NotFound);
//! assert!(!err.is_retryable());
//! # }
//! ```
//!
//! ## Configuration
//!
//! See [`DatasourceConfig`], [`CacheConfig`] and [`RetryPolicy`].
//!
//! ## Modules
//!
//! - [`cache`]: TTL entity cache and key builders
//! - [`resilience`]: Error taxonomy, classification, retry, batch handling
//! - [`datasource`]: The [`CachedDatasource`] composition
//! - [`config`]: Serde-backed configuration and validation
//! - [`metrics`]: `metrics` crate instrumentation

pub mod cache;
pub mod config;
pub mod datasource;
pub mod metrics;
pub mod resilience;

pub use cache::{build_entity_key, build_key, build_query_key, CacheError, CacheStats, EntityCache};
pub use config::{CacheConfig, ConfigError, DatasourceConfig};
pub use datasource::CachedDatasource;
pub use resilience::{
    BatchFailure, BatchOutcome, ErrorClassifier, ErrorCodeTable, ErrorKind, ErrorTranslator,
    NormalizedError, RawError, ResilienceEngine, RetryPolicy, StatusCodeTable,
};
