// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Collaborator contracts: demuxing sources, muxing sinks, video encoders.
//!
//! The core never parses containers or runs codecs itself; it drives these
//! traits. Backends (the in-memory one in [`crate::core::memory`], the
//! optional FFmpeg one) implement them, and [`MediaBackend`] is the factory a
//! session uses to open them by locator.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::frame::YuvFrame;
use super::packet::Packet;
use super::stream::{CodecParameters, MediaKind, StreamInfo};
use super::time_base::Rational;
use super::Result;

/// Something with exactly one release point.
pub trait Closeable {
    /// Release the underlying handle. Implementations must tolerate being
    /// called once only; [`ScopedResource`] guarantees that.
    fn close(&mut self) -> Result<()>;
}

impl<T: Closeable + ?Sized> Closeable for Box<T> {
    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// An opened, probed input container.
pub trait MediaSource: Closeable + Send {
    fn locator(&self) -> &str;

    /// Stream table, resolved at open time.
    fn streams(&self) -> &[StreamInfo];

    /// Container-level duration, when declared.
    fn duration(&self) -> Option<Duration> {
        None
    }

    /// Next packet from any stream, `None` once exhausted.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/// An output container being written.
pub trait MediaSink: Closeable + Send {
    fn locator(&self) -> &str;

    /// Create an output stream and return its index. `time_base` is a request;
    /// the container may pick another one when the header is written.
    fn add_stream(&mut self, kind: MediaKind, codec: &CodecParameters, time_base: Rational) -> Result<usize>;

    fn write_header(&mut self) -> Result<()>;

    /// Effective time base of an output stream. Final once the header is
    /// written.
    fn stream_time_base(&self, index: usize) -> Option<Rational>;

    /// Write with cross-stream interleaving. The sink buffers as needed to
    /// keep per-stream output timestamps monotonic.
    fn write_packet(&mut self, packet: Packet) -> Result<()>;

    fn write_trailer(&mut self) -> Result<()>;
}

/// Encoder settings handed to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderParams {
    pub codec_name: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Rational,
    /// Tick unit of the frames fed to the encoder.
    pub time_base: Rational,
    pub bitrate_bps: u32,
    pub qmin: u32,
    pub qmax: u32,
    pub keyframe_interval_frames: u32,
    /// Disable lookahead and frame reordering.
    pub zero_latency: bool,
    /// The sink needs codec headers out-of-band (MP4, FLV).
    pub global_header: bool,
}

/// A video encoder taking planar YUV 4:2:0 frames.
pub trait VideoEncoder: Closeable + Send {
    /// Parameters for the output stream carrying this encoder's packets.
    fn codec_parameters(&self) -> CodecParameters;

    /// Feed one frame. Returns a packet when one is ready; `None` while the
    /// encoder is still filling its delay buffer.
    fn encode(&mut self, frame: &YuvFrame) -> Result<Option<Packet>>;

    /// Signal end of input and take one buffered packet. Call repeatedly
    /// until it returns `None`.
    fn flush(&mut self) -> Result<Option<Packet>>;
}

/// Opens collaborators by locator.
pub trait MediaBackend: Send + Sync {
    fn open_source(&self, locator: &str) -> Result<Box<dyn MediaSource>>;

    fn create_sink(&self, locator: &str, container_hint: Option<&str>) -> Result<Box<dyn MediaSink>>;

    fn open_video_encoder(&self, params: &EncoderParams) -> Result<Box<dyn VideoEncoder>>;
}

/// Owns a collaborator and releases it exactly once.
///
/// [`ScopedResource::close`] releases explicitly and reports the result; if
/// that never happens (early return, panic unwinding) the drop releases it and
/// logs any failure.
pub struct ScopedResource<R: Closeable> {
    resource: R,
    label: String,
    released: bool,
}

impl<R: Closeable> ScopedResource<R> {
    pub fn new(resource: R, label: impl Into<String>) -> Self {
        Self {
            resource,
            label: label.into(),
            released: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release now. Later calls (and the drop) are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        tracing::debug!(resource = %self.label, "Releasing");
        self.resource.close()
    }
}

impl<R: Closeable> Deref for ScopedResource<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

impl<R: Closeable> DerefMut for ScopedResource<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.resource
    }
}

impl<R: Closeable> Drop for ScopedResource<R> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.resource.close() {
                tracing::warn!(resource = %self.label, error = %e, "Release on drop failed");
            }
        }
    }
}
