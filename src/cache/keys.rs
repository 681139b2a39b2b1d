// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cache key construction.
//!
//! Keys are colon-delimited so pattern invalidation can target segments:
//!
//! ```
//! use datasource_core::cache::keys::{build_key, build_entity_key, build_query_key};
//!
//! assert_eq!(build_key(&["users", "42", "profile"]), "users:42:profile");
//! assert_eq!(build_entity_key("getById", "42"), "getById:42");
//! assert_eq!(
//!     build_query_key("getAll", [("limit", 10), ("offset", 0)]),
//!     "getAll:query:limit=10&offset=0",
//! );
//! ```

use std::fmt::Display;

pub const SEPARATOR: char = ':';

/// Join ordered parts with `:`.
pub fn build_key<S: AsRef<str>>(parts: &[S]) -> String {
    let mut key = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        key.push_str(part.as_ref());
    }
    key
}

/// `operation:entity_id`
pub fn build_entity_key(operation: &str, entity_id: &str) -> String {
    build_key(&[operation, entity_id])
}

/// `operation:query:k1=v1&k2=v2`, parameters sorted by name.
///
/// Equal parameter sets produce identical keys regardless of iteration order.
pub fn build_query_key<I, K, V>(operation: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Display,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
        .collect();
    pairs.sort();

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    build_key(&[operation, "query", query.as_str()])
}
