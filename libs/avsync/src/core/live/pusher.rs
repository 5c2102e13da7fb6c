// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Live encode-and-push session paced against wall-clock time.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use super::config::LivePushConfig;
use super::pacing::bounded_pacing_delay;
use crate::core::cancel::CancelFlag;
use crate::core::clocks::{Clock, MonotonicClock, SessionClock};
use crate::core::error::PushError;
use crate::core::frame::YuvFrame;
use crate::core::media::{MediaBackend, MediaSink, ScopedResource, VideoEncoder};
use crate::core::packet::Packet;
use crate::core::stream::MediaKind;
use crate::core::time_base::{FrameDuration, Rational};

/// Lifecycle of a [`LivePusher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PusherState {
    Uninitialized,
    /// Header written, no packet emitted yet.
    Ready,
    Streaming,
    /// Flushing the encoder inside `stop`.
    Draining,
    Closed,
}

impl PusherState {
    pub fn name(self) -> &'static str {
        match self {
            PusherState::Uninitialized => "Uninitialized",
            PusherState::Ready => "Ready",
            PusherState::Streaming => "Streaming",
            PusherState::Draining => "Draining",
            PusherState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for PusherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything owned by one initialized session.
struct PushSession {
    encoder: ScopedResource<Box<dyn VideoEncoder>>,
    sink: ScopedResource<Box<dyn MediaSink>>,
    stream_index: usize,
    stream_time_base: Rational,
    frame_duration: FrameDuration,
    clock: SessionClock,
    width: u32,
    height: u32,
    frame_size: usize,
    frames_in: u64,
    frames_emitted: u64,
}

impl PushSession {
    /// Stamp the next packet from the frame-duration model and write it.
    fn emit(&mut self, mut packet: Packet) -> Result<(), PushError> {
        let pts = self.frame_duration.pts_for(self.frames_emitted);
        packet.pts = Some(pts);
        packet.dts = Some(pts);
        packet.duration = self.frame_duration.ticks();
        packet.stream_index = self.stream_index;
        packet.pos = -1;

        let packet_number = self.frames_emitted + 1;
        trace!(pts, size = packet.size(), keyframe = packet.is_keyframe, "Writing packet");
        self.sink
            .write_packet(packet)
            .map_err(|source| PushError::MuxWriteFailed { packet_number, source })?;
        self.frames_emitted = packet_number;
        Ok(())
    }

    /// Write the trailer, then release encoder and sink.
    fn finish(mut self, write_trailer: bool) -> Result<(), PushError> {
        let trailer = if write_trailer {
            self.sink.write_trailer().map_err(PushError::TrailerWriteFailed)
        } else {
            Ok(())
        };
        for (label, result) in [
            (self.encoder.label().to_string(), self.encoder.close()),
            (self.sink.label().to_string(), self.sink.close()),
        ] {
            if let Err(e) = result {
                warn!(resource = %label, error = %e, "Release failed");
            }
        }
        trailer
    }
}

/// Pushes raw camera frames through an encoder into a live sink, never faster
/// than real time.
///
/// Each emitted packet gets `pts = dts = frames_emitted / frame_rate`, rounded
/// once into the sink's stream time base; before writing, the caller's thread sleeps
/// until the session has been running for at least that long.
///
/// # Example
/// ```ignore
/// let mut pusher = LivePusher::new(backend, LivePushConfig::default());
/// pusher.init(640, 480, "rtmp://example.net/live/key")?;
/// while let Some(raw) = camera.next_frame() {
///     pusher.push_frame(&raw)?;
/// }
/// pusher.stop()?;
/// ```
pub struct LivePusher {
    backend: Arc<dyn MediaBackend>,
    config: LivePushConfig,
    clock: Arc<dyn Clock>,
    cancel: CancelFlag,
    state: PusherState,
    session: Option<PushSession>,
    /// Packets written by a session that has since been closed.
    emitted_at_close: u64,
}

impl LivePusher {
    pub fn new(backend: Arc<dyn MediaBackend>, config: LivePushConfig) -> Self {
        Self {
            backend,
            config,
            clock: Arc::new(MonotonicClock::new()),
            cancel: CancelFlag::new(),
            state: PusherState::Uninitialized,
            session: None,
            emitted_at_close: 0,
        }
    }

    /// Pace against `clock` instead of the system monotonic clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn state(&self) -> PusherState {
        self.state
    }

    pub fn config(&self) -> &LivePushConfig {
        &self.config
    }

    /// A handle that stops this pusher between frames.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Packets written to the sink so far.
    pub fn frames_emitted(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(self.emitted_at_close, |s| s.frames_emitted)
    }

    /// Effective output time base, once initialized.
    pub fn stream_time_base(&self) -> Option<Rational> {
        self.session.as_ref().map(|s| s.stream_time_base)
    }

    /// Open the encoder and the sink, write the header and start the session
    /// clock.
    ///
    /// On failure everything opened so far is released and the pusher stays
    /// `Uninitialized`.
    pub fn init(&mut self, width: u32, height: u32, sink_url: &str) -> Result<(), PushError> {
        self.require("init", &[PusherState::Uninitialized])?;

        let mut config = self.config.clone();
        config.width = width;
        config.height = height;
        config.validate().map_err(PushError::Configuration)?;

        let params = config.encoder_params();
        let encoder = self
            .backend
            .open_video_encoder(&params)
            .map_err(PushError::EncoderOpenFailed)?;
        let encoder = ScopedResource::new(encoder, "encoder");

        let sink = self
            .backend
            .create_sink(sink_url, Some(&config.container_hint))
            .map_err(|source| PushError::SinkOpenFailed {
                locator: sink_url.to_string(),
                source,
            })?;
        let mut sink = ScopedResource::new(sink, "sink");

        let stream_index = sink
            .add_stream(MediaKind::Video, &encoder.codec_parameters(), config.stream_time_base)
            .map_err(PushError::StreamSetupFailed)?;
        sink.write_header().map_err(PushError::HeaderWriteFailed)?;

        let stream_time_base = sink
            .stream_time_base(stream_index)
            .unwrap_or(config.stream_time_base);
        let frame_duration = FrameDuration::nominal(config.frame_rate, stream_time_base);

        info!(
            url = sink_url,
            width,
            height,
            frame_rate = %config.frame_rate,
            bitrate_bps = config.bitrate_bps,
            stream_time_base = %stream_time_base,
            frame_ticks = frame_duration.ticks(),
            "Live push ready"
        );

        self.session = Some(PushSession {
            encoder,
            sink,
            stream_index,
            stream_time_base,
            frame_duration,
            clock: SessionClock::start_on(Arc::clone(&self.clock)),
            width,
            height,
            frame_size: config.pixel_layout.frame_size(width, height),
            frames_in: 0,
            frames_emitted: 0,
        });
        self.config = config;
        self.state = PusherState::Ready;
        Ok(())
    }

    /// Encode one raw frame and, if the encoder produced a packet, write it
    /// once its presentation time has come.
    ///
    /// A write or encode failure ends the session: the trailer is attempted,
    /// resources are released and the pusher is `Closed`.
    pub fn push_frame(&mut self, raw: &[u8]) -> Result<(), PushError> {
        self.require("push_frame", &[PusherState::Ready, PusherState::Streaming])?;
        if self.cancel.is_cancelled() {
            return Err(PushError::Cancelled);
        }

        match self.encode_and_emit(raw) {
            Ok(emitted) => {
                if emitted && self.state == PusherState::Ready {
                    info!("Live push streaming");
                    self.state = PusherState::Streaming;
                }
                Ok(())
            }
            Err(e @ (PushError::EncodeFailed(_) | PushError::MuxWriteFailed { .. })) => {
                error!(error = %e, "Live push aborted");
                self.teardown(true);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns whether a packet was written.
    fn encode_and_emit(&mut self, raw: &[u8]) -> Result<bool, PushError> {
        let max_sleep = Duration::from_millis(self.config.max_pacing_sleep_ms);
        let layout = self.config.pixel_layout;
        let Some(session) = self.session.as_mut() else {
            return Err(PushError::InvalidState {
                operation: "push_frame",
                state: self.state.name(),
            });
        };

        if raw.len() != session.frame_size {
            return Err(PushError::FrameSizeMismatch {
                expected: session.frame_size,
                actual: raw.len(),
            });
        }
        let frame = YuvFrame::from_raw(raw, session.width, session.height, layout, session.frames_in as i64)
            .map_err(PushError::EncodeFailed)?;
        session.frames_in += 1;

        let Some(packet) = session.encoder.encode(&frame).map_err(PushError::EncodeFailed)? else {
            debug!(frames_in = session.frames_in, "Encoder buffering");
            return Ok(false);
        };

        let pts = session.frame_duration.pts_for(session.frames_emitted);
        let (delay, clamped) = bounded_pacing_delay(
            pts,
            session.stream_time_base,
            session.clock.elapsed(),
            max_sleep,
        );
        if clamped {
            warn!(pts, max_sleep_ms = max_sleep.as_millis() as u64, "Pacing sleep clamped");
        }
        if !delay.is_zero() {
            if self.cancel.is_cancelled() {
                debug!(pts, "Dropping packet, cancelled before pacing sleep");
                return Err(PushError::Cancelled);
            }
            debug!(pts, delay_us = delay.as_micros() as u64, "Pacing");
            session.clock.sleep(delay);
        }
        if self.cancel.is_cancelled() {
            debug!(pts, "Dropping packet, cancelled during pacing sleep");
            return Err(PushError::Cancelled);
        }

        session.emit(packet)?;
        Ok(true)
    }

    /// Drain the encoder, write the trailer and close.
    ///
    /// Flushed packets continue the timestamp sequence and are written
    /// without pacing.
    pub fn stop(&mut self) -> Result<(), PushError> {
        self.require("stop", &[PusherState::Ready, PusherState::Streaming])?;
        let Some(mut session) = self.session.take() else {
            return Err(PushError::InvalidState {
                operation: "stop",
                state: self.state.name(),
            });
        };

        self.state = PusherState::Draining;
        let before = session.frames_emitted;
        let drained = drain(&mut session);
        let flushed = session.frames_emitted - before;
        self.emitted_at_close = session.frames_emitted;
        let finished = session.finish(true);
        self.state = PusherState::Closed;

        info!(
            flushed,
            frames_emitted = before + flushed,
            "Live push stopped"
        );

        match (drained, finished) {
            (Err(e), Err(trailer_err)) => {
                warn!(error = %trailer_err, "Trailer write failed after earlier error");
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    /// Release encoder and sink without draining. No-op once `Closed`.
    pub fn close(&mut self) {
        if self.state == PusherState::Closed {
            return;
        }
        self.teardown(false);
    }

    fn teardown(&mut self, write_trailer: bool) {
        if let Some(session) = self.session.take() {
            self.emitted_at_close = session.frames_emitted;
            if let Err(e) = session.finish(write_trailer) {
                warn!(error = %e, "Trailer write failed during teardown");
            }
        }
        debug!(from = %self.state, "Live push closed");
        self.state = PusherState::Closed;
    }

    fn require(&self, operation: &'static str, allowed: &[PusherState]) -> Result<(), PushError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PushError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }
}

impl Drop for LivePusher {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LivePusher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePusher")
            .field("state", &self.state)
            .field("frames_emitted", &self.frames_emitted())
            .field("clock", &self.clock.description())
            .finish()
    }
}

fn drain(session: &mut PushSession) -> Result<(), PushError> {
    while let Some(packet) = session.encoder.flush().map_err(PushError::EncodeFailed)? {
        session.emit(packet)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(PusherState::Uninitialized.to_string(), "Uninitialized");
        assert_eq!(PusherState::Draining.name(), "Draining");
    }
}
