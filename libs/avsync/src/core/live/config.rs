// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Live push configuration.

use serde::{Deserialize, Serialize};

use crate::core::frame::PixelLayout;
use crate::core::media::EncoderParams;
use crate::core::time_base::Rational;

/// Live push configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivePushConfig {
    /// Frame width in pixels. Overridden by the size passed to `init`.
    pub width: u32,
    /// Frame height in pixels. Overridden by the size passed to `init`.
    pub height: u32,
    pub frame_rate: Rational,
    /// Target bitrate in bits per second.
    pub bitrate_bps: u32,
    pub qmin: u32,
    pub qmax: u32,
    /// Keyframe interval in frames.
    pub keyframe_interval_frames: u32,
    /// Disable lookahead and B-frames.
    pub zero_latency: bool,
    /// Layout of the raw buffers handed to `push_frame`.
    pub pixel_layout: PixelLayout,
    /// Container format for the sink.
    pub container_hint: String,
    /// Time base requested for the output stream.
    pub stream_time_base: Rational,
    /// Upper bound on a single pacing wait.
    pub max_pacing_sleep_ms: u64,
}

impl Default for LivePushConfig {
    fn default() -> Self {
        Self {
            width: 500,
            height: 400,
            frame_rate: Rational::new(25, 1),
            bitrate_bps: 400_000,
            qmin: 10,
            qmax: 51,
            keyframe_interval_frames: 250,
            zero_latency: true,
            pixel_layout: PixelLayout::Nv21,
            container_hint: "flv".to_string(),
            stream_time_base: Rational::MPEG_90K,
            max_pacing_sleep_ms: 1_000,
        }
    }
}

impl LivePushConfig {
    /// Create a new config with specified dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Set the target bitrate in bits per second.
    pub fn with_bitrate(mut self, bitrate_bps: u32) -> Self {
        self.bitrate_bps = bitrate_bps;
        self
    }

    pub fn with_keyframe_interval(mut self, frames: u32) -> Self {
        self.keyframe_interval_frames = frames;
        self
    }

    pub fn with_pixel_layout(mut self, layout: PixelLayout) -> Self {
        self.pixel_layout = layout;
        self
    }

    pub fn with_container_hint(mut self, hint: impl Into<String>) -> Self {
        self.container_hint = hint.into();
        self
    }

    pub fn with_stream_time_base(mut self, time_base: Rational) -> Self {
        self.stream_time_base = time_base;
        self
    }

    pub fn with_max_pacing_sleep_ms(mut self, ms: u64) -> Self {
        self.max_pacing_sleep_ms = ms;
        self
    }

    /// Check the values a session cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("frame size {}x{} is empty", self.width, self.height));
        }
        if self.frame_rate.num <= 0 || self.frame_rate.den <= 0 {
            return Err(format!("frame rate {} must be positive", self.frame_rate));
        }
        if self.stream_time_base.num <= 0 || self.stream_time_base.den <= 0 {
            return Err(format!("stream time base {} must be positive", self.stream_time_base));
        }
        if self.qmin > self.qmax {
            return Err(format!("qmin {} exceeds qmax {}", self.qmin, self.qmax));
        }
        Ok(())
    }

    /// Encoder settings for H.264 at this configuration. Frames are counted in
    /// the inverse of the frame rate.
    pub fn encoder_params(&self) -> EncoderParams {
        EncoderParams {
            codec_name: "h264".to_string(),
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
            time_base: self.frame_rate.invert(),
            bitrate_bps: self.bitrate_bps,
            qmin: self.qmin,
            qmax: self.qmax,
            keyframe_interval_frames: self.keyframe_interval_frames,
            zero_latency: self.zero_latency,
            global_header: matches!(self.container_hint.as_str(), "flv" | "mp4" | "mov"),
        }
    }
}
