// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! libavformat input.

use std::time::Duration;

use ffmpeg_next as ffmpeg;
use ffmpeg::format::context::Input;
use ffmpeg::media;

use super::{packet_from_av, AvCodecParameters};
use crate::core::media::{Closeable, MediaSource};
use crate::core::packet::Packet;
use crate::core::stream::{CodecParameters, MediaKind, NativeParameters, StreamInfo};
use crate::core::{MediaError, Result};

/// Demuxing source over any container or URL libavformat can open.
pub struct FfmpegSource {
    locator: String,
    input: Option<Input>,
    streams: Vec<StreamInfo>,
    duration: Option<Duration>,
}

impl FfmpegSource {
    pub fn open(locator: &str) -> Result<Self> {
        let input = ffmpeg::format::input(&locator).map_err(|e| MediaError::Open {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;

        let streams: Vec<StreamInfo> = input.streams().map(|s| describe(&s)).collect();
        let duration = u64::try_from(input.duration()).ok().map(Duration::from_micros);

        tracing::info!(
            locator,
            format = input.format().name(),
            streams = streams.len(),
            ?duration,
            "Opened source"
        );

        Ok(Self {
            locator: locator.to_string(),
            input: Some(input),
            streams,
            duration,
        })
    }
}

fn describe(stream: &ffmpeg::format::stream::Stream) -> StreamInfo {
    let params = stream.parameters();
    let kind = match params.medium() {
        media::Type::Video => MediaKind::Video,
        media::Type::Audio => MediaKind::Audio,
        _ => MediaKind::Other,
    };

    // SAFETY: `params` points at the stream's live AVCodecParameters; only
    // plain integer fields are read.
    let (width, height, sample_rate, channels, bit_rate) = unsafe {
        let raw = &*params.as_ptr();
        (
            raw.width.max(0) as u32,
            raw.height.max(0) as u32,
            raw.sample_rate.max(0) as u32,
            raw.ch_layout.nb_channels.max(0) as u16,
            raw.bit_rate.max(0) as u64,
        )
    };

    let rate = stream.avg_frame_rate();
    let frame_rate = (rate.numerator() > 0 && rate.denominator() > 0).then(|| rate.into());
    let rotation_degrees = stream
        .metadata()
        .get("rotate")
        .and_then(|v| v.parse::<f64>().ok());

    StreamInfo {
        index: stream.index(),
        kind,
        time_base: stream.time_base().into(),
        frame_rate,
        duration: (stream.duration() > 0).then(|| stream.duration()),
        rotation_degrees,
        codec: CodecParameters {
            codec_name: params.id().name().to_string(),
            width,
            height,
            sample_rate,
            channels,
            bit_rate,
            native: Some(NativeParameters::new(AvCodecParameters(params.clone()))),
        },
    }
}

impl Closeable for FfmpegSource {
    fn close(&mut self) -> Result<()> {
        match self.input.take() {
            Some(input) => {
                drop(input);
                tracing::debug!(locator = %self.locator, "Closed source");
                Ok(())
            }
            None => Err(MediaError::Closed(self.locator.clone())),
        }
    }
}

impl MediaSource for FfmpegSource {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        let input = self
            .input
            .as_mut()
            .ok_or_else(|| MediaError::Closed(self.locator.clone()))?;
        let mut pkt = ffmpeg::Packet::empty();
        match pkt.read(input) {
            Ok(()) => Ok(Some(packet_from_av(&pkt))),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(MediaError::Read(format!("{}: {e}", self.locator))),
        }
    }
}

// FfmpegSource is Send because the format context is only used from the
// thread that owns the session.
unsafe impl Send for FfmpegSource {}
