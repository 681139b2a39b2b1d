// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic with exponential backoff.
//!
//! Every attempt's failure is translated first; only retryable kinds
//! (network, timeout, rate-limited) are retried, and never more than
//! `max_attempts` times in total.
//!
//! ```text
//! Attempting(1) ──ok──→ Success
//!      │ err
//!      ├─ not retryable OR n == max ──→ Failed(NormalizedError)
//!      └─ retryable AND n < max ──→ Waiting(delay n) ──→ Attempting(n+1)
//! ```
//!
//! # Example
//!
//! ```
//! use datasource_core::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.max_attempts, 3);
//! assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
//! assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(1));
//! assert_eq!(policy.delay_for_attempt(20), Duration::from_secs(30)); // capped
//! ```

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::engine::ResilienceEngine;
use super::error::{NormalizedError, RawError};
use crate::config::ConfigError;

/// Retry bounds and backoff schedule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failure (default: 500ms)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single delay (default: 30s)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between successive delays (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 { 3 }
fn default_initial_delay_ms() -> u64 { 500 }
fn default_max_delay_ms() -> u64 { 30_000 }
fn default_backoff_multiplier() -> f64 { 2.0 }

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Quick retry for interactive reads: 3 attempts, delays capped at 2s.
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2_000,
            backoff_multiplier: 2.0,
        }
    }

    /// Single attempt, errors are still translated.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 10,
            backoff_multiplier: 2.0,
        }
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Wait after failed attempt `attempt` (1-based):
    /// `min(initial_delay * multiplier^(attempt-1), max_delay)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let max = self.max_delay();
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.initial_delay().as_nanos() as f64 * self.backoff_multiplier.powi(exponent);

        if !nanos.is_finite() || nanos >= max.as_nanos() as f64 {
            return max;
        }
        Duration::from_nanos(nanos.max(0.0).round() as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::ShrinkingBackoff(self.backoff_multiplier));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::DelayBounds {
                initial: self.initial_delay_ms,
                max: self.max_delay_ms,
            });
        }
        Ok(())
    }
}

impl ResilienceEngine {
    /// Run `operation` under the engine's default policy.
    pub async fn with_retry<F, Fut, T, E>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawError>,
    {
        let policy = self.policy().clone();
        self.with_retry_policy(operation_name, &policy, operation).await
    }

    /// Run `operation` under an explicit policy.
    pub async fn with_retry_policy<F, Fut, T, E>(
        &self,
        operation_name: &str,
        policy: &RetryPolicy,
        operation: F,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawError>,
    {
        self.with_retry_if(operation_name, policy, NormalizedError::is_retryable, operation)
            .await
    }

    /// Run `operation`, retrying while `should_retry` accepts the translated error.
    ///
    /// Always terminates: at most `policy.max_attempts` calls (minimum 1).
    #[tracing::instrument(skip_all, fields(operation = operation_name))]
    pub async fn with_retry_if<F, Fut, T, E, P>(
        &self,
        operation_name: &str,
        policy: &RetryPolicy,
        should_retry: P,
        mut operation: F,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawError>,
        P: Fn(&NormalizedError) -> bool,
    {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(
                            "Operation '{}' succeeded after {} attempts",
                            operation_name, attempt
                        );
                    }
                    crate::metrics::record_operation_outcome(operation_name, "success");
                    return Ok(value);
                }
                Err(raw) => {
                    let err = self.translate(raw.into(), Some(operation_name));

                    if !should_retry(&err) {
                        debug!(kind = %err.kind, attempt, "Operation '{}' failed, not retrying: {}", operation_name, err.message);
                        crate::metrics::record_operation_outcome(operation_name, "failed");
                        return Err(err.with_context("attempts", attempt));
                    }

                    if attempt >= max_attempts {
                        warn!(kind = %err.kind, "Operation '{}' failed after {} attempts: {}", operation_name, attempt, err.message);
                        crate::metrics::record_operation_outcome(operation_name, "exhausted");
                        return Err(err.with_context("attempts", attempt));
                    }

                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        kind = %err.kind,
                        "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name, attempt, max_attempts, err.message, delay
                    );
                    crate::metrics::record_retry(operation_name, err.kind.as_str(), delay);

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
