// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic clock that only moves when told to.

use super::Clock;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Clock whose time advances only through [`ManualClock::advance`] or
/// [`Clock::sleep`]. Every requested sleep is recorded.
///
/// Used to test pacing without waiting in real time.
pub struct ManualClock {
    now_ns: AtomicI64,
    sleeps: Mutex<Vec<Duration>>,
    description: String,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now_ns: AtomicI64::new(0),
            sleeps: Mutex::new(Vec::new()),
            description: "Manual Clock".to_string(),
        }
    }

    /// Move time forward without recording a sleep (simulates work).
    pub fn advance(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.now_ns.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> i64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }

    fn description(&self) -> &str {
        &self.description
    }
}
