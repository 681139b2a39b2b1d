// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache Engine
//!
//! A generic, TTL-aware, size-bounded key/value store with pattern
//! invalidation and a lazily-armed background sweep.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Cache Module                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  entry.rs  - CacheEntry: value + stored_at + optional TTL    │
//! │  store.rs  - EntityCache: get/put/remove/invalidate/stats    │
//! │              └─ cleanup timer: armed on first put,           │
//! │                 cancelled on clear/dispose/drop              │
//! │  keys.rs   - build_key / build_entity_key / build_query_key  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use datasource_core::{EntityCache, CacheConfig};
//! use datasource_core::cache::keys::{build_entity_key, build_query_key};
//! use std::time::Duration;
//!
//! let cache: EntityCache<String> = EntityCache::new(CacheConfig::named("users", 100));
//!
//! cache.put_with_ttl(build_entity_key("getById", "42"), "alice".into(), Some(Duration::from_secs(300)));
//! cache.put(build_query_key("getAll", [("limit", 10)]), "[...]".into());
//!
//! // A write to entity 42 drops every list result
//! cache.invalidate_by_pattern("getAll:.*").unwrap();
//!
//! assert_eq!(cache.get("getById:42"), Some("alice".to_string()));
//! assert!(!cache.contains("getAll:query:limit=10"));
//! ```

pub mod entry;
pub mod keys;
pub mod store;

pub use entry::CacheEntry;
pub use keys::{build_entity_key, build_key, build_query_key};
pub use store::{CacheError, CacheStats, EntityCache};
