// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::time::Duration;
use tokio::time::Instant;

/// A cached value plus the metadata needed for expiry and eviction.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
    /// `None` never expires via TTL (still subject to size eviction)
    pub ttl: Option<Duration>,
    /// Write sequence number, breaks `stored_at` ties during eviction
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    /// Unsequenced entry stamped now; the store always goes through `stamped`.
    #[cfg(test)]
    fn new(value: V, ttl: Option<Duration>) -> Self {
        Self::stamped(value, ttl, Instant::now(), 0)
    }

    pub(crate) fn stamped(value: V, ttl: Option<Duration>, stored_at: Instant, seq: u64) -> Self {
        Self {
            value,
            stored_at,
            ttl,
            seq,
        }
    }

    /// Expired iff a TTL is set and `now >= stored_at + ttl`.
    ///
    /// A deadline past the representable range never expires.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => self
                .stored_at
                .checked_add(ttl)
                .is_some_and(|deadline| now >= deadline),
            None => false,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Eviction order key: oldest write first.
    pub(crate) fn age_key(&self) -> (Instant, u64) {
        (self.stored_at, self.seq)
    }
}
