// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! libav-backed collaborators (`ffmpeg` feature).

mod encoder;
mod sink;
mod source;

use bytes::Bytes;
use ffmpeg_next as ffmpeg;

pub use encoder::FfmpegVideoEncoder;
pub use sink::FfmpegSink;
pub use source::FfmpegSource;

use crate::core::media::{EncoderParams, MediaBackend, MediaSink, MediaSource, VideoEncoder};
use crate::core::packet::Packet;
use crate::core::time_base::Rational;
use crate::core::{MediaError, Result};

/// [`MediaBackend`] over libavformat and libavcodec.
#[derive(Debug, Clone, Copy)]
pub struct FfmpegBackend {
    _initialized: (),
}

impl FfmpegBackend {
    /// Initialize libav (idempotent) and return a backend.
    pub fn new() -> Result<Self> {
        ffmpeg::init().map_err(|e| MediaError::Configuration(format!("libav init failed: {e}")))?;
        tracing::debug!("libav initialized");
        Ok(Self { _initialized: () })
    }
}

impl MediaBackend for FfmpegBackend {
    fn open_source(&self, locator: &str) -> Result<Box<dyn MediaSource>> {
        Ok(Box::new(FfmpegSource::open(locator)?))
    }

    fn create_sink(&self, locator: &str, container_hint: Option<&str>) -> Result<Box<dyn MediaSink>> {
        Ok(Box::new(FfmpegSink::create(locator, container_hint)?))
    }

    fn open_video_encoder(&self, params: &EncoderParams) -> Result<Box<dyn VideoEncoder>> {
        Ok(Box::new(FfmpegVideoEncoder::open(params)?))
    }
}

/// Codec parameters owned outside any format context, so a sink can copy
/// them verbatim.
pub(crate) struct AvCodecParameters(pub(crate) ffmpeg::codec::Parameters);

// SAFETY: the wrapped parameters are a private copy (no owner back-reference)
// and are only read through `&self`.
unsafe impl Send for AvCodecParameters {}
unsafe impl Sync for AvCodecParameters {}

impl From<ffmpeg::Rational> for Rational {
    fn from(r: ffmpeg::Rational) -> Self {
        Rational::new(r.numerator(), r.denominator())
    }
}

impl From<Rational> for ffmpeg::Rational {
    fn from(r: Rational) -> Self {
        ffmpeg::Rational::new(r.num, r.den)
    }
}

pub(crate) fn packet_from_av(pkt: &ffmpeg::Packet) -> Packet {
    Packet {
        data: Bytes::copy_from_slice(pkt.data().unwrap_or(&[])),
        pts: pkt.pts(),
        dts: pkt.dts(),
        duration: pkt.duration(),
        stream_index: pkt.stream(),
        pos: pkt.position() as i64,
        is_keyframe: pkt.is_key(),
    }
}

pub(crate) fn packet_to_av(packet: &Packet) -> ffmpeg::Packet {
    let mut pkt = ffmpeg::Packet::copy(&packet.data);
    pkt.set_pts(packet.pts);
    pkt.set_dts(packet.dts);
    pkt.set_duration(packet.duration);
    pkt.set_position(packet.pos as isize);
    pkt.set_stream(packet.stream_index);
    if packet.is_keyframe {
        pkt.set_flags(ffmpeg::packet::Flags::KEY);
    }
    pkt
}
