// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Live pacing pusher: raw camera frames in, real-time paced packets out.

mod config;
mod pacing;
mod pusher;

pub use config::LivePushConfig;
pub use pacing::{bounded_pacing_delay, pacing_delay};
pub use pusher::{LivePusher, PusherState};
