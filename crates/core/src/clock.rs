// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time source abstraction.
//!
//! The engine only ever needs wall-clock milliseconds since the epoch, both to
//! stamp `createdAt` and to compute `finishedIn`. Routing it through a trait
//! keeps job-lifecycle tests deterministic.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of wall-clock time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> i64;
}

/// Real wall-clock time.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// A clock with a settable, monotonically-advanceable value, for tests.
pub struct FakeClock {
    now_ms: AtomicI64,
}

impl FakeClock {
    pub fn new(epoch_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(epoch_ms),
        }
    }

    pub fn set(&self, epoch_ms: i64) {
        self.now_ms.store(epoch_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
