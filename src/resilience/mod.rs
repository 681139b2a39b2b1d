// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resilience Engine
//!
//! Converts heterogeneous backend errors into one normalized taxonomy and
//! wraps asynchronous operations with retry/backoff and batch aggregation.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Resilience Module                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  error.rs     - ErrorKind, RawError, NormalizedError         │
//! │  classify.rs  - ordered classifier tables → ErrorTranslator  │
//! │  engine.rs    - ResilienceEngine: translate / is_retryable   │
//! │  retry.rs     - RetryPolicy + with_retry (bounded backoff)   │
//! │  batch.rs     - BatchOutcome + with_batch_error_handling     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The only suspension point owned by this module is the backoff sleep
//! between attempts. Cancellation is the caller's concern: dropping the
//! returned future stops the loop.

pub mod batch;
pub mod classify;
pub mod engine;
pub mod error;
pub mod retry;

pub use batch::{BatchFailure, BatchOutcome};
pub use classify::{ErrorClassifier, ErrorCodeTable, ErrorTranslator, FallbackClassifier, StatusCodeTable};
pub use engine::ResilienceEngine;
pub use error::{ErrorKind, NormalizedError, RawError};
pub use retry::RetryPolicy;
