// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Audio/video remux synchronization and real-time paced live pushing.
//!
//! Two independent session types sit on top of a small timestamp toolkit:
//!
//! - [`Remuxer`] merges a video-only and an audio-only container into one,
//!   re-timing and interleaving packets without decoding.
//! - [`LivePusher`] encodes raw camera frames and writes them to a live sink
//!   no faster than real time.
//!
//! Container and codec work is delegated to a [`MediaBackend`]: the in-memory
//! one in [`crate::core::memory`], or libav via the `ffmpeg` feature.

// Session entry points take a backend plus several locators.
#![allow(clippy::too_many_arguments)]

pub mod core;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

pub use crate::core::prelude;

pub use crate::core::{
    compare_ts, pacing_delay, probe, remux, remux_files, rescale, rescale_timestamp, CancelFlag, Clock,
    CodecParameters, EncoderParams, EndPolicy, LivePushConfig, LivePusher, ManualClock, MediaBackend, MediaError,
    MediaInfo, MediaKind, MediaSink, MediaSource, MonotonicClock, Packet, PixelLayout, PushError, PusherState,
    Rational, RemuxConfig, RemuxError, RemuxReport, Remuxer, Result, SessionClock, StreamInfo, VideoEncoder,
};

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegBackend;
