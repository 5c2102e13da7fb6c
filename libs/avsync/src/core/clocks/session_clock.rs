// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Elapsed time anchored at session start.
//!
//! Captures the clock value once, when the session starts, and reports every
//! later reading relative to it.

use super::{Clock, MonotonicClock};
use std::sync::Arc;
use std::time::Duration;

/// Per-session elapsed-time reference.
///
/// Each live or remux session owns its own instance; nothing is shared
/// between sessions.
#[derive(Clone)]
pub struct SessionClock {
    clock: Arc<dyn Clock>,
    start_ns: i64,
}

impl SessionClock {
    /// Start a session clock on the real monotonic clock.
    pub fn start() -> Self {
        Self::start_on(Arc::new(MonotonicClock::new()))
    }

    /// Start a session clock on an arbitrary clock, capturing "now" as zero.
    pub fn start_on(clock: Arc<dyn Clock>) -> Self {
        let start_ns = clock.now_ns();
        Self { clock, start_ns }
    }

    /// Re-anchor at the current instant.
    pub fn restart(&mut self) {
        self.start_ns = self.clock.now_ns();
    }

    /// Nanoseconds since the session started.
    #[inline]
    pub fn elapsed_ns(&self) -> i64 {
        self.clock.now_ns() - self.start_ns
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns().max(0) as u64)
    }

    /// Seconds since the session started.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ns() as f64 / 1_000_000_000.0
    }

    /// Block on the underlying clock.
    pub fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration);
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for SessionClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClock")
            .field("clock", &self.clock.description())
            .field("start_ns", &self.start_ns)
            .finish()
    }
}
