// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error taxonomy.
//!
//! Backend integrations convert their native errors into [`RawError`];
//! the translator turns a `RawError` into a [`NormalizedError`], which is
//! the only error type callers above the datasource layer ever see.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Normalized error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connectivity/transport failure
    Network,
    /// Operation exceeded a deadline
    Timeout,
    /// Backend signaled throttling
    RateLimited,
    /// Credentials invalid or missing
    Authentication,
    /// Caller lacks permission
    Authorization,
    /// Referenced entity absent
    NotFound,
    /// Duplicate or version conflict
    Conflict,
    /// Input failed backend-side validation
    Validation,
    /// Malformed payload during encode/decode
    Serialization,
    /// Unclassified
    Generic,
}

impl ErrorKind {
    /// Transient kinds are retryable; everything else, `Generic` included, is not.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::RateLimited)
    }

    /// Stable snake_case label for logs and metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Serialization => "serialization",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend error before classification.
#[derive(Error, Debug)]
pub enum RawError {
    /// Transport-style backend responded with a status code
    #[error("status {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Field-level validation detail, if the backend reported any
        field_errors: BTreeMap<String, String>,
    },

    /// Store-style backend reported a symbolic error code
    #[error("{code}: {message}")]
    Code { code: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("deadline elapsed")]
    Elapsed(#[from] tokio::time::error::Elapsed),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(String),

    /// Already translated (e.g. the result of a nested `with_retry`)
    #[error(transparent)]
    Normalized(#[from] NormalizedError),
}

impl RawError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }

    pub fn code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Code {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Human-readable message without the status/code prefix
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } | Self::Code { message, .. } => message.clone(),
            Self::InvalidArgument(message) | Self::Other(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Backend-agnostic error surfaced to callers.
///
/// Cheap to clone: the raw cause is shared.
#[derive(Error, Debug, Clone)]
#[error("{kind} error{}: {message}", operation_suffix(.operation))]
pub struct NormalizedError {
    pub kind: ErrorKind,
    pub message: String,
    /// Logical operation being attempted (e.g. `getById`)
    pub operation: Option<String>,
    /// Original backend error, kept for debugging
    #[source]
    pub cause: Option<Arc<RawError>>,
    pub context: BTreeMap<String, Value>,
    /// Field-level detail for `Validation` errors
    pub field_errors: BTreeMap<String, String>,
}

impl NormalizedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: None,
            cause: None,
            context: BTreeMap::new(),
            field_errors: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: RawError) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.field_errors.insert(field.into(), message.into());
        self
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn raw(&self) -> Option<&RawError> {
        self.cause.as_deref()
    }
}

fn operation_suffix(operation: &Option<String>) -> String {
    match operation {
        Some(op) => format!(" in {op}"),
        None => String::new(),
    }
}
