// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API routes.

pub mod jobs;

use axum::middleware;
use axum::Router;

use crate::state::AppState;
use crate::version::strip_api_version;

/// Build the full API router: unversioned job routes, wrapped in the
/// version-prefix-stripping middleware so `/v1/jobs` and `/jobs` both
/// reach the same handlers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/jobs", jobs::router())
        .with_state(state)
        .layer(middleware::from_fn(strip_api_version))
}
