// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod cancel;
pub mod clocks;
pub mod error;
pub mod frame;
pub mod live;
pub mod media;
pub mod memory;
pub mod packet;
pub mod prelude;
pub mod probe;
pub mod remux;
pub mod stream;
pub mod time_base;

pub use cancel::{cancellable_loop, CancelFlag, LoopControl, LoopExit};
pub use clocks::{Clock, ManualClock, MonotonicClock, SessionClock};
pub use error::*;
pub use frame::{PixelLayout, YuvFrame};
pub use live::{pacing_delay, LivePushConfig, LivePusher, PusherState};
pub use media::{Closeable, EncoderParams, MediaBackend, MediaSink, MediaSource, ScopedResource, VideoEncoder};
pub use packet::Packet;
pub use probe::{probe, MediaInfo, StreamSummary};
pub use remux::{remux, remux_files, EndPolicy, RemuxConfig, RemuxReport, Remuxer};
pub use stream::{CodecParameters, MediaKind, NativeParameters, StreamInfo};
pub use time_base::{
    compare_ts, duration_to_ticks, rescale, rescale_q_rnd, rescale_rnd, rescale_timestamp, ticks_to_duration,
    FrameDuration, Rational, Rounding,
};
