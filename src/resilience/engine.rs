// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use super::classify::{ErrorClassifier, ErrorTranslator};
use super::error::{ErrorKind, NormalizedError, RawError};
use super::retry::RetryPolicy;

/// Error translation plus retry/batch wrappers for one backend.
///
/// Holds no per-call state, so one engine can serve any number of
/// concurrent operations.
#[derive(Debug, Clone, Default)]
pub struct ResilienceEngine {
    translator: ErrorTranslator,
    policy: RetryPolicy,
}

impl ResilienceEngine {
    pub fn new(translator: ErrorTranslator, policy: RetryPolicy) -> Self {
        Self { translator, policy }
    }

    /// Engine for a REST backend with the default policy
    pub fn rest() -> Self {
        Self::new(ErrorTranslator::rest(), RetryPolicy::default())
    }

    /// Engine for a document-store backend with the default policy
    pub fn document_store() -> Self {
        Self::new(ErrorTranslator::document_store(), RetryPolicy::default())
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: impl ErrorClassifier + 'static) -> Self {
        self.translator = self.translator.with_classifier(classifier);
        self
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub fn translator(&self) -> &ErrorTranslator {
        &self.translator
    }

    pub fn translate(&self, raw: RawError, operation: Option<&str>) -> NormalizedError {
        self.translator.translate(raw, operation)
    }

    /// Fixed policy table: network, timeout and rate-limited are retryable.
    #[must_use]
    pub fn is_retryable(kind: ErrorKind) -> bool {
        kind.is_retryable()
    }
}
