// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Batch error aggregation.
//!
//! Every operation runs to completion regardless of its siblings; each
//! input lands in exactly one of `succeeded` / `failed`.

use futures::future::join_all;
use std::future::Future;
use tracing::warn;

use super::engine::ResilienceEngine;
use super::error::{NormalizedError, RawError};

/// A failed batch item, indexed by its position in the input.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub index: usize,
    pub error: NormalizedError,
}

/// Per-item results of a batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<BatchFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.index).collect()
    }
}

impl ResilienceEngine {
    /// Run every operation concurrently, capturing each result or translated error.
    ///
    /// No retry is applied here; pass operations already wrapped in
    /// [`with_retry`](Self::with_retry) if they need it.
    #[tracing::instrument(skip_all, fields(operation = operation_name))]
    pub async fn with_batch_error_handling<I, Fut, T, E>(
        &self,
        operation_name: &str,
        operations: I,
    ) -> BatchOutcome<T>
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawError>,
    {
        let results = join_all(operations).await;
        let mut outcome = BatchOutcome::default();

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(value) => outcome.succeeded.push(value),
                Err(raw) => {
                    let error = self
                        .translate(raw.into(), Some(operation_name))
                        .with_context("index", index);
                    warn!(index, kind = %error.kind, "Batch item in '{}' failed: {}", operation_name, error.message);
                    crate::metrics::record_batch_failure(operation_name, error.kind.as_str());
                    outcome.failed.push(BatchFailure { index, error });
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::error::ErrorKind;
    use crate::resilience::retry::RetryPolicy;
    use std::pin::Pin;

    type BoxedOp = Pin<Box<dyn Future<Output = Result<u32, RawError>> + Send>>;

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let engine = ResilienceEngine::rest();
        let ops: Vec<BoxedOp> = (0..5u32)
            .map(|i| -> BoxedOp {
                Box::pin(async move {
                    match i {
                        1 => Err(RawError::status(404, "missing")),
                        3 => Err(RawError::status(403, "forbidden")),
                        _ => Ok(i * 10),
                    }
                })
            })
            .collect();

        let outcome = engine.with_batch_error_handling("getMany", ops).await;

        assert_eq!(outcome.succeeded, vec![0, 20, 40]);
        assert_eq!(outcome.failed_indices(), vec![1, 3]);
        assert_eq!(outcome.failed[0].error.kind, ErrorKind::NotFound);
        assert_eq!(outcome.failed[1].error.kind, ErrorKind::Authorization);
        assert_eq!(outcome.failed[1].error.operation.as_deref(), Some("getMany"));
        assert_eq!(outcome.total(), 5);
        assert!(!outcome.is_complete_success());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let engine = ResilienceEngine::rest();
        let ops: Vec<BoxedOp> = Vec::new();

        let outcome = engine.with_batch_error_handling("noop", ops).await;

        assert_eq!(outcome.total(), 0);
        assert!(outcome.is_complete_success());
    }

    #[tokio::test]
    async fn test_batch_of_retry_wrapped_operations() {
        let engine = ResilienceEngine::rest().with_policy(RetryPolicy::test());
        let engine_ref = &engine;

        let ops = (0..3u32).map(|i| async move {
            engine_ref
                .with_retry("getOne", || async move {
                    if i == 2 {
                        Err(RawError::status(409, "conflict"))
                    } else {
                        Ok(i)
                    }
                })
                .await
        });

        let outcome = engine.with_batch_error_handling("getMany", ops).await;

        assert_eq!(outcome.succeeded, vec![0, 1]);
        assert_eq!(outcome.failed.len(), 1);
        let failure = &outcome.failed[0];
        assert_eq!(failure.index, 2);
        assert_eq!(failure.error.kind, ErrorKind::Conflict);
        // Inner operation name is kept
        assert_eq!(failure.error.operation.as_deref(), Some("getOne"));
    }
}
