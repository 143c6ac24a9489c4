// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The HTTP surface for the Dray pipeline engine: an `axum` router over a
//! [`dray_engine::JobManager`], translating the job CRUD / log-tailing
//! contract into JSON endpoints.

pub mod config;
pub mod error;
mod extract;
pub mod routes;
pub mod state;
pub mod version;

pub use config::Config;
pub use state::AppState;
