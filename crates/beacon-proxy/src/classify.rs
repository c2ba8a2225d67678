// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request classification.

use std::sync::LazyLock;

use regex::Regex;

/// File extensions served cache-first.
static STATIC_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(js|css|png|jpg|jpeg|gif|svg|ico|woff|woff2|ttf|eot)$").unwrap()
});

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Upstream first; fall back to cache on transport failure.
    NetworkFirst,
    /// Cache first; fetch and store only on a miss.
    CacheFirst,
}

/// Pick a strategy from the request path (query string excluded).
///
/// Paths under `api_prefix` are always network-first, even if they end in a
/// static extension.
pub fn classify(path: &str, api_prefix: &str) -> Strategy {
    if path.starts_with(api_prefix) {
        Strategy::NetworkFirst
    } else if STATIC_ASSET.is_match(path) {
        Strategy::CacheFirst
    } else {
        Strategy::NetworkFirst
    }
}

/// Whether the request is a top-level page load.
pub fn is_navigation(method: &str, headers: &[(String, String)]) -> bool {
    let header = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    };
    if let Some(dest) = header("sec-fetch-dest") {
        return dest.eq_ignore_ascii_case("document");
    }
    method.eq_ignore_ascii_case("GET") && header("accept").is_some_and(|a| a.contains("text/html"))
}

/// Strip the query string from a path-and-query.
pub fn path_of(path_and_query: &str) -> &str {
    path_and_query
        .split_once('?')
        .map_or(path_and_query, |(path, _)| path)
}
