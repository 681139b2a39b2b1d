// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error classification tables.
//!
//! Translation is data-driven: an ordered list of classifiers, each
//! returning `Some(kind)` when it recognises the error. The first match
//! wins; the [`FallbackClassifier`] is always consulted last, and an error
//! nobody recognises becomes [`ErrorKind::Generic`].
//!
//! ```text
//! RawError ──→ StatusCodeTable ──→ ErrorCodeTable ──→ Fallback ──→ Generic
//!                  │ Some(kind)         │ Some(kind)      │ Some(kind)
//!                  └────────────────────┴─────────────────┴──→ NormalizedError
//! ```
//!
//! # Example
//!
//! ```
//! use datasource_core::{ErrorTranslator, ErrorKind, RawError};
//!
//! let translator = ErrorTranslator::rest();
//! let err = translator.translate(RawError::status(429, "slow down"), Some("getAll"));
//! assert_eq!(err.kind, ErrorKind::RateLimited);
//! assert!(err.is_retryable());
//! ```

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use super::error::{ErrorKind, NormalizedError, RawError};

/// One classification rule set.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, raw: &RawError) -> Option<ErrorKind>;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&RawError) -> Option<ErrorKind> + Send + Sync,
{
    fn classify(&self, raw: &RawError) -> Option<ErrorKind> {
        self(raw)
    }
}

/// Status code → kind, for transport-style backends.
#[derive(Debug, Clone, Default)]
pub struct StatusCodeTable {
    table: HashMap<u16, ErrorKind>,
}

impl StatusCodeTable {
    pub fn new(entries: &[(u16, ErrorKind)]) -> Self {
        Self {
            table: entries.iter().copied().collect(),
        }
    }

    /// Conventional REST status mapping
    pub fn rest() -> Self {
        Self::new(&[
            (400, ErrorKind::Validation),
            (401, ErrorKind::Authentication),
            (403, ErrorKind::Authorization),
            (404, ErrorKind::NotFound),
            (408, ErrorKind::Timeout),
            (409, ErrorKind::Conflict),
            (412, ErrorKind::Conflict),
            (422, ErrorKind::Validation),
            (429, ErrorKind::RateLimited),
            (502, ErrorKind::Network),
            (503, ErrorKind::Network),
            (504, ErrorKind::Timeout),
        ])
    }

    #[must_use]
    pub fn with(mut self, status: u16, kind: ErrorKind) -> Self {
        self.table.insert(status, kind);
        self
    }
}

impl ErrorClassifier for StatusCodeTable {
    fn classify(&self, raw: &RawError) -> Option<ErrorKind> {
        match raw {
            RawError::Status { status, .. } => self.table.get(status).copied(),
            _ => None,
        }
    }
}

/// Symbolic error code → kind, for store-style backends.
#[derive(Debug, Clone, Default)]
pub struct ErrorCodeTable {
    table: HashMap<String, ErrorKind>,
}

impl ErrorCodeTable {
    pub fn new(entries: &[(&str, ErrorKind)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(code, kind)| ((*code).to_string(), *kind))
                .collect(),
        }
    }

    /// Document-store status codes (gRPC canonical names, kebab-case)
    pub fn document_store() -> Self {
        Self::new(&[
            ("unauthenticated", ErrorKind::Authentication),
            ("permission-denied", ErrorKind::Authorization),
            ("not-found", ErrorKind::NotFound),
            ("already-exists", ErrorKind::Conflict),
            ("aborted", ErrorKind::Conflict),
            ("invalid-argument", ErrorKind::Validation),
            ("failed-precondition", ErrorKind::Validation),
            ("out-of-range", ErrorKind::Validation),
            ("resource-exhausted", ErrorKind::RateLimited),
            ("deadline-exceeded", ErrorKind::Timeout),
            ("unavailable", ErrorKind::Network),
            ("data-loss", ErrorKind::Serialization),
        ])
    }

    #[must_use]
    pub fn with(mut self, code: impl Into<String>, kind: ErrorKind) -> Self {
        self.table.insert(code.into(), kind);
        self
    }
}

impl ErrorClassifier for ErrorCodeTable {
    fn classify(&self, raw: &RawError) -> Option<ErrorKind> {
        match raw {
            RawError::Code { code, .. } => self.table.get(code.as_str()).copied(),
            _ => None,
        }
    }
}

/// Language-level errors any backend can produce.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackClassifier;

impl ErrorClassifier for FallbackClassifier {
    fn classify(&self, raw: &RawError) -> Option<ErrorKind> {
        match raw {
            RawError::Io(err) => classify_io(err.kind()),
            RawError::Json(_) => Some(ErrorKind::Serialization),
            RawError::Elapsed(_) => Some(ErrorKind::Timeout),
            RawError::InvalidArgument(_) => Some(ErrorKind::Validation),
            _ => None,
        }
    }
}

fn classify_io(kind: io::ErrorKind) -> Option<ErrorKind> {
    use io::ErrorKind as Io;
    match kind {
        Io::ConnectionRefused
        | Io::ConnectionReset
        | Io::ConnectionAborted
        | Io::NotConnected
        | Io::BrokenPipe
        | Io::AddrNotAvailable
        | Io::HostUnreachable
        | Io::NetworkUnreachable => Some(ErrorKind::Network),
        Io::TimedOut => Some(ErrorKind::Timeout),
        Io::InvalidData | Io::UnexpectedEof => Some(ErrorKind::Serialization),
        Io::InvalidInput => Some(ErrorKind::Validation),
        Io::PermissionDenied => Some(ErrorKind::Authorization),
        Io::NotFound => Some(ErrorKind::NotFound),
        _ => None,
    }
}

/// Ordered classifier chain producing [`NormalizedError`]s.
#[derive(Clone)]
pub struct ErrorTranslator {
    classifiers: Vec<Arc<dyn ErrorClassifier>>,
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ErrorTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorTranslator")
            .field("classifiers", &self.classifiers.len())
            .finish()
    }
}

impl ErrorTranslator {
    /// Fallback rules only
    pub fn new() -> Self {
        Self {
            classifiers: Vec::new(),
        }
    }

    /// Translator for a REST backend
    pub fn rest() -> Self {
        Self::new().with_classifier(StatusCodeTable::rest())
    }

    /// Translator for a document-store backend
    pub fn document_store() -> Self {
        Self::new().with_classifier(ErrorCodeTable::document_store())
    }

    /// Append a classifier. Earlier classifiers take precedence.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl ErrorClassifier + 'static) -> Self {
        self.classifiers.push(Arc::new(classifier));
        self
    }

    pub fn classify(&self, raw: &RawError) -> ErrorKind {
        if let RawError::Normalized(err) = raw {
            return err.kind;
        }
        self.classifiers
            .iter()
            .find_map(|c| c.classify(raw))
            .or_else(|| FallbackClassifier.classify(raw))
            .unwrap_or(ErrorKind::Generic)
    }

    /// Convert a raw backend error, keeping it as the cause.
    ///
    /// An already-normalized error passes through unchanged apart from
    /// gaining the operation name if it had none.
    pub fn translate(&self, raw: RawError, operation: Option<&str>) -> NormalizedError {
        if let RawError::Normalized(mut err) = raw {
            if err.operation.is_none() {
                err.operation = operation.map(str::to_string);
            }
            return err;
        }

        let kind = self.classify(&raw);
        let mut err = NormalizedError::new(kind, raw.message());

        match &raw {
            RawError::Status { status, field_errors, .. } => {
                err = err.with_context("status", *status);
                err.field_errors.extend(field_errors.clone());
            }
            RawError::Code { code, .. } => {
                err = err.with_context("code", code.as_str());
            }
            _ => {}
        }

        if let Some(op) = operation {
            err = err.with_operation(op);
        }
        err.with_cause(raw)
    }
}
