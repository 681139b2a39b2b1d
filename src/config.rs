// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the cache and resilience engines.
//!
//! # Example
//!
//! ```
//! use datasource_core::{CacheConfig, DatasourceConfig, RetryPolicy};
//!
//! // Minimal config (uses defaults)
//! let config = DatasourceConfig::default();
//! assert_eq!(config.cache.max_size, 1000);
//! assert_eq!(config.retry.max_attempts, 3);
//!
//! // Tuned config
//! let config = DatasourceConfig {
//!     cache: CacheConfig {
//!         name: "users".into(),
//!         max_size: 500,
//!         default_ttl_ms: 60_000,
//!         ..Default::default()
//!     },
//!     retry: RetryPolicy::query(),
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::resilience::retry::RetryPolicy;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("cache max_size must be at least 1")]
    ZeroCapacity,
    #[error("cache cleanup_interval_ms must be greater than 0")]
    ZeroCleanupInterval,
    #[error("eviction_batch_size must be at least 1")]
    ZeroEvictionBatch,
    #[error("retry max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("retry backoff_multiplier must be >= 1.0, got {0}")]
    ShrinkingBackoff(f64),
    #[error("retry initial_delay_ms ({initial}) exceeds max_delay_ms ({max})")]
    DelayBounds { initial: u64, max: u64 },
}

/// Cache engine settings.
///
/// All fields have defaults matching a typical per-datasource cache:
/// 1000 entries, 5 minute TTL, sweep every minute.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Label used in log fields and metric labels
    #[serde(default = "default_cache_name")]
    pub name: String,

    /// Hard cap on entry count (default: 1000)
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// TTL applied when `put` does not specify one (default: 5 minutes)
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: u64,

    /// Background sweep cadence (default: 1 minute)
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,

    /// Entries dropped per eviction event. `None` means 10% of `max_size`.
    #[serde(default)]
    pub eviction_batch_size: Option<usize>,
}

fn default_cache_name() -> String { "cache".to_string() }
fn default_max_size() -> usize { 1000 }
fn default_ttl_ms() -> u64 { 5 * 60 * 1000 } // 5 minutes
fn default_cleanup_interval_ms() -> u64 { 60 * 1000 } // 1 minute

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: default_cache_name(),
            max_size: default_max_size(),
            default_ttl_ms: default_ttl_ms(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            eviction_batch_size: None,
        }
    }
}

impl CacheConfig {
    /// Config with a given label and capacity, everything else default.
    pub fn named(name: impl Into<String>, max_size: usize) -> Self {
        Self {
            name: name.into(),
            max_size,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Number of oldest entries removed when a write would overflow the cache.
    ///
    /// Proportional to capacity so small caches are not wiped by one overflow.
    #[must_use]
    pub fn eviction_batch(&self) -> usize {
        self.eviction_batch_size
            .unwrap_or(self.max_size / 10)
            .clamp(1, self.max_size.max(1))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.cleanup_interval_ms == 0 {
            return Err(ConfigError::ZeroCleanupInterval);
        }
        if self.eviction_batch_size == Some(0) {
            return Err(ConfigError::ZeroEvictionBatch);
        }
        Ok(())
    }
}

/// Everything a datasource needs to build its cache and resilience engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasourceConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl DatasourceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.retry.validate()
    }
}
