// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state handed to every axum handler.

use dray_engine::JobManager;

/// Cheap to clone: `JobManager` is itself composed of `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub manager: JobManager,
}

impl AppState {
    pub fn new(manager: JobManager) -> Self {
        Self { manager }
    }
}
