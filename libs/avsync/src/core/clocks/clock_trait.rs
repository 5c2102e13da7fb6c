// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Clock trait - monotonic time reference and blocking wait for sessions.

use std::time::Duration;

/// Monotonic time source used for pacing.
///
/// Clocks are passive: a session asks for the current time, decides how long
/// to wait, and then asks the clock to wait. Keeping the wait on the clock
/// lets tests substitute a deterministic clock whose `sleep` simply advances
/// time.
///
/// ## Usage in the live pusher
///
/// ```rust,ignore
/// let elapsed = session_clock.elapsed();
/// let deadline = ticks_to_duration(dts, stream_time_base);
/// if deadline > elapsed {
///     session_clock.sleep(deadline - elapsed);
/// }
/// sink.write_packet(packet)?;
/// ```
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds since an arbitrary, fixed epoch.
    ///
    /// Guaranteed never to decrease.
    fn now_ns(&self) -> i64;

    /// Current time as Duration (convenience)
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_ns().max(0) as u64)
    }

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Human-readable clock description
    ///
    /// Used for logging.
    fn description(&self) -> &str;
}
