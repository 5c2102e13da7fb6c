// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! libavformat output with interleaved writes.

use ffmpeg_next as ffmpeg;
use ffmpeg::format::context::Output;
use ffmpeg::{codec, encoder, media};

use super::{packet_to_av, AvCodecParameters};
use crate::core::media::{Closeable, MediaSink};
use crate::core::packet::Packet;
use crate::core::stream::{CodecParameters, MediaKind};
use crate::core::time_base::Rational;
use crate::core::{MediaError, Result};

/// Muxing sink over a file path or a network URL (`rtmp://`, `srt://`).
pub struct FfmpegSink {
    locator: String,
    output: Option<Output>,
}

impl FfmpegSink {
    /// Create the output. `container_hint` forces the format; otherwise it is
    /// guessed from the locator.
    pub fn create(locator: &str, container_hint: Option<&str>) -> Result<Self> {
        let opened = match container_hint {
            Some(format) => ffmpeg::format::output_as(&locator, format),
            None => ffmpeg::format::output(&locator),
        };
        let output = opened.map_err(|e| MediaError::Open {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(locator, format = output.format().name(), "Created sink");
        Ok(Self {
            locator: locator.to_string(),
            output: Some(output),
        })
    }

    fn output(&mut self) -> Result<&mut Output> {
        self.output
            .as_mut()
            .ok_or_else(|| MediaError::Closed(self.locator.clone()))
    }
}

/// Parameters for a stream whose source was not libav.
fn portable_parameters(kind: MediaKind, codec: &CodecParameters) -> Result<codec::Parameters> {
    let id = ffmpeg::decoder::find_by_name(&codec.codec_name)
        .map(|c| c.id())
        .ok_or_else(|| MediaError::NotSupported(format!("codec '{}'", codec.codec_name)))?;
    let medium = match kind {
        MediaKind::Video => media::Type::Video,
        MediaKind::Audio => media::Type::Audio,
        MediaKind::Other => media::Type::Data,
    };

    let mut params = codec::Parameters::new();
    // SAFETY: `params` owns a freshly allocated AVCodecParameters; only plain
    // fields are written.
    unsafe {
        let raw = &mut *params.as_mut_ptr();
        raw.codec_type = medium.into();
        raw.codec_id = id.into();
        raw.width = codec.width as i32;
        raw.height = codec.height as i32;
        raw.sample_rate = codec.sample_rate as i32;
        raw.bit_rate = codec.bit_rate as i64;
    }
    Ok(params)
}

impl Closeable for FfmpegSink {
    fn close(&mut self) -> Result<()> {
        match self.output.take() {
            Some(output) => {
                drop(output);
                tracing::debug!(locator = %self.locator, "Closed sink");
                Ok(())
            }
            None => Err(MediaError::Closed(self.locator.clone())),
        }
    }
}

impl MediaSink for FfmpegSink {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn add_stream(&mut self, kind: MediaKind, codec: &CodecParameters, time_base: Rational) -> Result<usize> {
        let native = codec
            .native
            .as_ref()
            .and_then(|n| n.downcast_ref::<AvCodecParameters>())
            .map(|p| p.0.clone());
        let params = match native {
            Some(params) => params,
            None => portable_parameters(kind, codec)?,
        };

        let output = self.output()?;
        let mut stream = output
            .add_stream(encoder::find(codec::Id::None))
            .map_err(|e| MediaError::Write(format!("add {kind} stream: {e}")))?;
        stream.set_parameters(params);
        // SAFETY: the stream's parameters were just set and are owned by the
        // output context; the source container's tag may not be valid here.
        unsafe {
            (*stream.parameters().as_mut_ptr()).codec_tag = 0;
        }
        stream.set_time_base(time_base);
        Ok(stream.index())
    }

    fn write_header(&mut self) -> Result<()> {
        let locator = self.locator.clone();
        self.output()?
            .write_header()
            .map_err(|e| MediaError::Write(format!("{locator}: header: {e}")))
    }

    fn stream_time_base(&self, index: usize) -> Option<Rational> {
        self.output.as_ref()?.stream(index).map(|s| s.time_base().into())
    }

    fn write_packet(&mut self, packet: Packet) -> Result<()> {
        let mut pkt = packet_to_av(&packet);
        let output = self.output()?;
        pkt.write_interleaved(output)
            .map_err(|e| MediaError::Write(format!("packet on stream {}: {e}", packet.stream_index)))
    }

    fn write_trailer(&mut self) -> Result<()> {
        let locator = self.locator.clone();
        self.output()?
            .write_trailer()
            .map_err(|e| MediaError::Write(format!("{locator}: trailer: {e}")))
    }
}

// FfmpegSink is Send because the format context is only used from the thread
// that owns the session.
unsafe impl Send for FfmpegSink {}
