// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Everything a session caller usually needs.
//!
//! ```ignore
//! use avsync::prelude::*;
//! ```

pub use super::cancel::CancelFlag;
pub use super::clocks::{Clock, MonotonicClock};
pub use super::error::{MediaError, PushError, RemuxError};
pub use super::frame::PixelLayout;
pub use super::live::{LivePushConfig, LivePusher, PusherState};
pub use super::media::{MediaBackend, MediaSink, MediaSource, VideoEncoder};
pub use super::probe::{probe, MediaInfo};
pub use super::remux::{remux_files, EndPolicy, RemuxConfig, RemuxReport, Remuxer};
pub use super::time_base::{rescale, Rational};
