// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Wall-clock pacing of outgoing packets.

use std::time::Duration;

use crate::core::time_base::{ticks_to_duration, Rational};

/// How long to wait before a packet stamped `dts` may leave.
///
/// The packet's deadline is `dts` converted to wall time, measured from the
/// session start. Returns zero when `elapsed` has already reached it.
pub fn pacing_delay(dts: i64, time_base: Rational, elapsed: Duration) -> Duration {
    ticks_to_duration(dts, time_base).saturating_sub(elapsed)
}

/// [`pacing_delay`] bounded by `max`. The flag reports whether the bound hit.
pub fn bounded_pacing_delay(dts: i64, time_base: Rational, elapsed: Duration, max: Duration) -> (Duration, bool) {
    let delay = pacing_delay(dts, time_base, elapsed);
    if delay > max { (max, true) } else { (delay, false) }
}
