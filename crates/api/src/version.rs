// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Middleware that accepts and strips a leading API version segment
//! (`/v<digits>[.<digits>]*`) so routes are declared unversioned and both
//! `/jobs` and `/v1/jobs` (or `/v1.2/jobs`) reach the same handler.

use axum::extract::Request;
use axum::http::uri::PathAndQuery;
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::Response;

pub async fn strip_api_version(mut req: Request, next: Next) -> Response {
    if let Some(new_path) = strip_version_prefix(req.uri().path()) {
        let query = req
            .uri()
            .query()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();
        if let Ok(path_and_query) = format!("{new_path}{query}").parse::<PathAndQuery>() {
            let mut parts = req.uri().clone().into_parts();
            parts.path_and_query = Some(path_and_query);
            if let Ok(new_uri) = Uri::from_parts(parts) {
                *req.uri_mut() = new_uri;
            }
        }
    }
    next.run(req).await
}

/// `true` for a path segment matching `v<digits>[.<digits>]*`, e.g. `v1`,
/// `v1.2`, `v10.0.3`.
fn is_version_segment(segment: &str) -> bool {
    match segment.strip_prefix('v') {
        Some(rest) if !rest.is_empty() => rest
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())),
        _ => false,
    }
}

/// Strip a leading version segment from `path`, returning the remainder
/// (always starting with `/`) if the first segment was a version marker,
/// `None` (leave the path untouched) otherwise.
fn strip_version_prefix(path: &str) -> Option<String> {
    let rest = path.strip_prefix('/')?;
    let mut parts = rest.splitn(2, '/');
    let first = parts.next().unwrap_or("");
    if !is_version_segment(first) {
        return None;
    }
    Some(match parts.next() {
        Some(remainder) => format!("/{remainder}"),
        None => "/".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        single_digit = { "v1", true },
        minor_version = { "v1.2", true },
        multi_component = { "v10.0.3", true },
        no_leading_v = { "jobs", false },
        empty_digits = { "v", false },
        trailing_dot = { "v1.", false },
        non_numeric = { "vNext", false },
    )]
    fn version_segment_detection(segment: &str, expected: bool) {
        assert_eq!(is_version_segment(segment), expected);
    }

    #[yare::parameterized(
        versioned = { "/v1/jobs", Some("/jobs") },
        versioned_minor = { "/v1.2/jobs/abc", Some("/jobs/abc") },
        version_only = { "/v1", Some("/") },
        unversioned = { "/jobs", None },
        root = { "/", None },
    )]
    fn strip_version_prefix_cases(path: &str, expected: Option<&str>) {
        assert_eq!(strip_version_prefix(path).as_deref(), expected);
    }
}
