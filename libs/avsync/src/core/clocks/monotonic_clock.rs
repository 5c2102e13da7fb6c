// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::Clock;
use std::time::{Duration, Instant};

/// Wall-clock time from [`Instant`], counted from construction.
pub struct MonotonicClock {
    start_time: Instant,
    description: String,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::with_description("Monotonic Clock".to_string())
    }

    pub fn with_description(description: String) -> Self {
        Self {
            start_time: Instant::now(),
            description,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> i64 {
        i64::try_from(self.start_time.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn description(&self) -> &str {
        &self.description
    }
}
