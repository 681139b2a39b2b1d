//! Integration Tests for Datasource Core
//!
//! End-to-end scenarios across the public API: cache lifecycle under
//! paused time, retry bounds, batch isolation and the cached datasource flow.
//!
//! # Running Tests
//! ```bash
//! cargo test --test integration
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use datasource_core::{
    CacheConfig, CachedDatasource, DatasourceConfig, EntityCache, ErrorKind, ErrorTranslator,
    RawError, ResilienceEngine, RetryPolicy,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("datasource_core=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay_ms: 1,
        max_delay_ms: 10,
        backoff_multiplier: 2.0,
    }
}

// =============================================================================
// Cache lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_entity_and_list_lifecycle() {
    init_tracing();
    let cache: EntityCache<String> = EntityCache::new(CacheConfig::named("users", 100));

    cache.put_with_ttl("getById:42", "alice".to_string(), Some(Duration::from_secs(300)));
    cache.put("getAll:query:limit=10", "[alice]".to_string());

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(cache.get("getById:42").as_deref(), Some("alice"));

    // A write lands; list results are stale, the entity is not
    let removed = cache.invalidate_by_pattern("getAll:.*").unwrap();
    assert_eq!(removed, 1);
    assert!(!cache.contains("getAll:query:limit=10"));
    assert!(cache.contains("getById:42"));

    tokio::time::advance(Duration::from_secs(241)).await;
    assert_eq!(cache.get("getById:42"), None);
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_background_sweep_reclaims_expired_entries() {
    init_tracing();
    let cache: EntityCache<u32> = EntityCache::new(CacheConfig {
        name: "sweep".into(),
        max_size: 100,
        default_ttl_ms: 1_000,
        cleanup_interval_ms: 5_000,
        eviction_batch_size: None,
    });

    for i in 0..10 {
        cache.put(format!("getById:{i}"), i);
    }
    cache.put_with_ttl("getById:pinned", 99, None);
    assert!(cache.is_sweeper_armed());

    tokio::time::advance(Duration::from_secs(6)).await;
    // Let the sweeper task run its tick
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }

    // Swept without any read touching the keys
    assert_eq!(cache.len(), 1);
    let stats = cache.stats();
    assert_eq!(stats.total_entries, 1);
    assert!(stats.last_cleanup_ms.is_some());

    cache.dispose();
    assert!(!cache.is_sweeper_armed());
}

#[tokio::test(start_paused = true)]
async fn test_overflow_evicts_oldest_batch() {
    let cache: EntityCache<u32> = EntityCache::new(CacheConfig::named("small", 20));

    for i in 0..20u32 {
        cache.put(format!("getById:{i}"), i);
        tokio::time::advance(Duration::from_millis(1)).await;
    }
    cache.put("getById:new", 100);

    // 10% of 20 = 2 oldest dropped
    assert_eq!(cache.len(), 19);
    assert!(!cache.contains("getById:0"));
    assert!(!cache.contains("getById:1"));
    assert!(cache.contains("getById:2"));
    assert!(cache.contains("getById:new"));
}

#[tokio::test]
async fn test_invalid_pattern_leaves_cache_intact() {
    let cache: EntityCache<u32> = EntityCache::with_capacity(10);
    cache.put("getById:1", 1);

    let err = cache.invalidate_by_pattern("getAll:(").unwrap_err();
    assert!(err.to_string().contains("getAll:("));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_shared_cache_across_tasks() {
    let cache: Arc<EntityCache<usize>> = Arc::new(EntityCache::with_capacity(1_000));
    let mut handles = Vec::new();

    for task in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..200 {
                let key = format!("getById:{}", task * 1_000 + i);
                cache.put(key.clone(), i);
                cache.get(&key);
                if i % 3 == 0 {
                    cache.invalidate_for_entity(&(task * 1_000 + i).to_string());
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert!(cache.len() <= 1_000);
}

// =============================================================================
// Resilience
// =============================================================================

#[tokio::test]
async fn test_retry_gives_up_after_max_attempts() {
    init_tracing();
    let engine = ResilienceEngine::rest().with_policy(fast_retry(4));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let err = engine
        .with_retry("getById", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RawError::status(503, "unavailable"))
            }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(err.kind, ErrorKind::Network);
    assert!(err.is_retryable());
    assert_eq!(err.operation.as_deref(), Some("getById"));
}

#[tokio::test]
async fn test_non_retryable_fails_fast() {
    let engine = ResilienceEngine::document_store().with_policy(fast_retry(5));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let err = engine
        .with_retry("update", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(RawError::code("permission-denied", "no access"))
            }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_custom_classifier_takes_precedence_over_fallback() {
    let engine = ResilienceEngine::rest()
        .with_policy(fast_retry(2))
        .with_classifier(|raw: &RawError| match raw {
            RawError::Other(message) if message.contains("socket hang up") => Some(ErrorKind::Network),
            _ => None,
        });
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let value = engine
        .with_retry("getById", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RawError::other("socket hang up"))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Cached datasource
// =============================================================================

async fn read_user(
    ds: &CachedDatasource<String>,
    backend: &Arc<parking_lot::Mutex<String>>,
    reads: &Arc<AtomicUsize>,
) -> Result<String, datasource_core::NormalizedError> {
    ds.fetch_by_id("getById", "42", || {
        let backend = backend.clone();
        let reads = reads.clone();
        async move {
            reads.fetch_add(1, Ordering::SeqCst);
            Ok::<_, RawError>(backend.lock().clone())
        }
    })
    .await
}

#[tokio::test]
async fn test_datasource_read_write_read() {
    init_tracing();
    let config: DatasourceConfig = serde_json::from_value(serde_json::json!({
        "cache": { "name": "users", "max_size": 50 },
        "retry": { "max_attempts": 2, "initial_delay_ms": 1, "max_delay_ms": 5 }
    }))
    .unwrap();
    let ds: CachedDatasource<String> = CachedDatasource::new(config, ErrorTranslator::rest()).unwrap();

    let backend = Arc::new(parking_lot::Mutex::new(String::from("alice")));
    let reads = Arc::new(AtomicUsize::new(0));

    assert_eq!(read_user(&ds, &backend, &reads).await.unwrap(), "alice");
    assert_eq!(read_user(&ds, &backend, &reads).await.unwrap(), "alice");
    assert_eq!(reads.load(Ordering::SeqCst), 1);

    let writer = backend.clone();
    ds.mutate("update", "42", move || {
        let writer = writer.clone();
        async move {
            *writer.lock() = "alicia".to_string();
            Ok::<_, RawError>(())
        }
    })
    .await
    .unwrap();

    // Entity invalidated by the write, next read hits the backend
    assert_eq!(read_user(&ds, &backend, &reads).await.unwrap(), "alicia");
    assert_eq!(reads.load(Ordering::SeqCst), 2);

    ds.dispose();
    assert!(ds.cache().is_empty());
}

#[tokio::test]
async fn test_datasource_fetch_many_isolates_failures() {
    let ds: CachedDatasource<u32> = CachedDatasource::new(
        DatasourceConfig {
            cache: CacheConfig::named("items", 100),
            retry: fast_retry(2),
        },
        ErrorTranslator::document_store(),
    )
    .unwrap();

    let outcome = ds
        .fetch_many("getById", &["1", "2", "3", "4"], |id| async move {
            match id.as_str() {
                "2" => Err(RawError::code("not-found", "gone")),
                "4" => Err(RawError::code("invalid-argument", "bad id")),
                _ => Ok(id.parse::<u32>().unwrap_or(0)),
            }
        })
        .await;

    assert_eq!(outcome.succeeded, vec![1, 3]);
    assert_eq!(outcome.failed_indices(), vec![1, 3]);
    assert_eq!(outcome.failed[0].error.kind, ErrorKind::NotFound);
    assert_eq!(outcome.failed[1].error.kind, ErrorKind::Validation);
    assert_eq!(ds.cache().len(), 2);
}
