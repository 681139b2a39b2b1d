// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded, expiring entity cache.
//!
//! # Flow
//!
//! ```text
//! put(key, value, ttl)
//!       │
//!       ├─→ key is new AND cache full → evict oldest batch (by stored_at)
//!       │
//!       ├─→ insert entry (stored_at = now)
//!       │
//!       └─→ arm cleanup timer if not running
//!
//! get(key)
//!       │
//!       ├─→ live entry → clone value
//!       ├─→ expired entry → remove, miss
//!       └─→ absent → miss
//! ```
//!
//! The entry map sits behind one mutex; the sweeper handle behind another.
//! Neither lock is held while the other is taken.

use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::entry::CacheEntry;
use crate::config::{CacheConfig, ConfigError};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid invalidation pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Point-in-time view of cache contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub valid_entries: usize,
    pub max_size: usize,
    /// Epoch millis of the last sweep, `None` if no sweep has run
    pub last_cleanup_ms: Option<u64>,
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
    last_cleanup_ms: Option<u64>,
}

struct CacheInner<V> {
    config: CacheConfig,
    state: Mutex<CacheState<V>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

/// TTL-aware, size-bounded key/value cache owned by a single datasource.
///
/// Not `Clone`: one datasource, one cache. Wrap in `Arc` to share across tasks.
pub struct EntityCache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> EntityCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache from config. A zero `max_size` is raised to 1 and a
    /// zero `cleanup_interval_ms` falls back to the default interval.
    pub fn new(mut config: CacheConfig) -> Self {
        if config.max_size == 0 {
            warn!(cache = %config.name, "Cache max_size of 0 raised to 1");
            config.max_size = 1;
        }
        if config.cleanup_interval_ms == 0 {
            let fallback = CacheConfig::default().cleanup_interval_ms;
            warn!(cache = %config.name, fallback, "Cache cleanup_interval_ms of 0 replaced with default");
            config.cleanup_interval_ms = fallback;
        }
        Self {
            inner: Arc::new(CacheInner {
                config,
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    next_seq: 0,
                    last_cleanup_ms: None,
                }),
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Create a cache, rejecting invalid config instead of adjusting it.
    pub fn try_new(config: CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Default config with the given capacity
    pub fn with_capacity(max_size: usize) -> Self {
        Self::new(CacheConfig {
            max_size,
            ..Default::default()
        })
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Returns the value if present and not expired. An expired entry is removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let value = self.inner.with_live_entry(key, |entry| entry.value.clone());
        crate::metrics::record_cache_lookup(&self.inner.config.name, value.is_some());
        value
    }

    /// Expiry-aware presence check, same semantics as `get(key).is_some()`.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.with_live_entry(key, |_| ()).is_some()
    }

    /// Insert with the configured default TTL.
    pub fn put(&self, key: impl Into<String>, value: V) {
        let ttl = self.inner.config.default_ttl();
        self.put_with_ttl(key, value, Some(ttl));
    }

    /// Insert or replace. `ttl = None` never expires; `Some(Duration::ZERO)` is expired on next read.
    pub fn put_with_ttl(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let max_size = self.inner.config.max_size;

        let (evicted, len) = {
            let mut state = self.inner.state.lock();
            let mut evicted = 0;
            if state.entries.len() >= max_size && !state.entries.contains_key(&key) {
                evicted = state.evict_oldest(self.inner.config.eviction_batch());
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state
                .entries
                .insert(key, CacheEntry::stamped(value, ttl, Instant::now(), seq));
            (evicted, state.entries.len())
        };

        if evicted > 0 {
            debug!(cache = %self.inner.config.name, evicted, max_size, "Evicted oldest entries");
            crate::metrics::record_evictions(&self.inner.config.name, evicted);
        }
        crate::metrics::set_cache_entries(&self.inner.config.name, len);

        self.arm_sweeper();
    }

    /// Unconditional delete. Returns whether an entry was present.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.state.lock().entries.remove(key).is_some()
    }

    /// Remove every entry and stop the cleanup timer.
    pub fn clear(&self) {
        let removed = {
            let mut state = self.inner.state.lock();
            let n = state.entries.len();
            state.entries.clear();
            n
        };
        self.stop_sweeper();
        crate::metrics::set_cache_entries(&self.inner.config.name, 0);
        debug!(cache = %self.inner.config.name, removed, "Cache cleared");
    }

    /// Tear down: clear entries and cancel the timer. Safe to call repeatedly.
    pub fn dispose(&self) {
        self.clear();
    }

    /// Remove every key matching `pattern` (regex, unanchored).
    ///
    /// Patterns run on the `regex` crate's linear-time engine, so a hostile
    /// pattern cannot backtrack catastrophically. A pattern matching nothing is a no-op.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let regex = Regex::new(pattern).map_err(|source| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(self.invalidate_matching(&regex))
    }

    /// Remove every key matching an already-compiled pattern.
    pub fn invalidate_matching(&self, regex: &Regex) -> usize {
        let removed = self.inner.invalidate_where(|key| regex.is_match(key));
        debug!(cache = %self.inner.config.name, pattern = %regex.as_str(), removed, "Invalidated by pattern");
        removed
    }

    /// Remove every key for which `predicate` returns true.
    pub fn invalidate_if(&self, predicate: impl FnMut(&str) -> bool) -> usize {
        self.inner.invalidate_where(predicate)
    }

    /// Remove every key whose last `:`-delimited segment is `entity_id`
    /// (the `operation:id` shape). The id is matched literally.
    pub fn invalidate_for_entity(&self, entity_id: &str) -> usize {
        let suffix = format!(":{entity_id}");
        let removed = self.inner.invalidate_where(|key| key.ends_with(&suffix));
        debug!(cache = %self.inner.config.name, entity_id, removed, "Invalidated entity");
        removed
    }

    /// Diagnostic snapshot; scans every entry.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let state = self.inner.state.lock();
        let expired_entries = state
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .count();
        let total_entries = state.entries.len();

        CacheStats {
            total_entries,
            expired_entries,
            valid_entries: total_entries - expired_entries,
            max_size: self.inner.config.max_size,
            last_cleanup_ms: state.last_cleanup_ms,
        }
    }

    /// Remove every currently expired entry. Runs on the cleanup timer; callable manually.
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    /// Raw entry count, including expired entries not yet swept
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().entries.is_empty()
    }

    /// Snapshot of stored keys (unordered)
    pub fn keys(&self) -> Vec<String> {
        self.inner.state.lock().entries.keys().cloned().collect()
    }

    /// Whether the background cleanup task is currently running
    #[must_use]
    pub fn is_sweeper_armed(&self) -> bool {
        self.inner
            .sweeper
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn arm_sweeper(&self) {
        let mut sweeper = self.inner.sweeper.lock();
        if sweeper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        // Without a runtime the cache still works; expiry is then lazy only.
        let Ok(runtime) = Handle::try_current() else {
            trace!(cache = %self.inner.config.name, "No Tokio runtime, cleanup timer not armed");
            return;
        };

        let period = self.inner.config.cleanup_interval();
        let task = sweep_loop(Arc::downgrade(&self.inner), period);
        *sweeper = Some(runtime.spawn(task));
        debug!(cache = %self.inner.config.name, ?period, "Cleanup timer armed");
    }

    fn stop_sweeper(&self) {
        if let Some(handle) = self.inner.sweeper.lock().take() {
            handle.abort();
            debug!(cache = %self.inner.config.name, "Cleanup timer stopped");
        }
    }
}

impl<V> CacheInner<V> {
    fn with_live_entry<R>(&self, key: &str, f: impl FnOnce(&CacheEntry<V>) -> R) -> Option<R> {
        let now = Instant::now();
        let mut state = self.state.lock();
        match state.entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired_at(now) => return Some(f(entry)),
            Some(_) => {}
        }
        state.entries.remove(key);
        drop(state);

        trace!(cache = %self.config.name, key, "Lazily expired entry");
        crate::metrics::record_expirations(&self.config.name, 1);
        None
    }

    fn invalidate_where(&self, mut matches: impl FnMut(&str) -> bool) -> usize {
        let removed = {
            let mut state = self.state.lock();
            let before = state.entries.len();
            state.entries.retain(|key, _| !matches(key));
            before - state.entries.len()
        };
        if removed > 0 {
            crate::metrics::record_invalidations(&self.config.name, removed);
        }
        removed
    }

    fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let (removed, len) = {
            let mut state = self.state.lock();
            let before = state.entries.len();
            state.entries.retain(|_, entry| !entry.is_expired_at(now));
            state.last_cleanup_ms = Some(epoch_millis());
            (before - state.entries.len(), state.entries.len())
        };

        if removed > 0 {
            debug!(cache = %self.config.name, removed, remaining = len, "Swept expired entries");
            crate::metrics::record_expirations(&self.config.name, removed);
        }
        crate::metrics::set_cache_entries(&self.config.name, len);
        removed
    }
}

impl<V> Drop for CacheInner<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

impl<V> CacheState<V> {
    /// Drop up to `batch` entries, oldest `stored_at` first (write order breaks ties).
    fn evict_oldest(&mut self, batch: usize) -> usize {
        let batch = batch.min(self.entries.len());
        if batch == 0 {
            return 0;
        }

        let mut by_age: Vec<((Instant, u64), &String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.age_key(), key))
            .collect();
        by_age.sort_unstable_by_key(|(age, _)| *age);

        let victims: Vec<String> = by_age
            .into_iter()
            .take(batch)
            .map(|(_, key)| key.clone())
            .collect();

        for key in &victims {
            self.entries.remove(key);
        }
        victims.len()
    }
}

/// Periodic sweep. Holds only a weak reference so a dropped cache ends the loop.
async fn sweep_loop<V>(inner: Weak<CacheInner<V>>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(cache) = inner.upgrade() else {
            break;
        };
        cache.sweep_expired();
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
