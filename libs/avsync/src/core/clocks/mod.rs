// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod clock_trait;
mod manual_clock;
mod monotonic_clock;
mod session_clock;

pub use clock_trait::Clock;
pub use manual_clock::ManualClock;
pub use monotonic_clock::MonotonicClock;
pub use session_clock::SessionClock;
