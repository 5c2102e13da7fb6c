// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! One-shot media inspection: open, snapshot the stream table, close.

use serde::{Deserialize, Serialize};

use super::media::{MediaBackend, ScopedResource};
use super::stream::{MediaKind, StreamInfo};
use super::time_base::{rescale, Rational};
use super::Result;

/// Summary of one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub index: usize,
    pub kind: MediaKind,
    pub codec_name: String,
    pub time_base: Rational,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<Rational>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_degrees: Option<f64>,
}

impl From<&StreamInfo> for StreamSummary {
    fn from(stream: &StreamInfo) -> Self {
        Self {
            index: stream.index,
            kind: stream.kind,
            codec_name: stream.codec.codec_name.clone(),
            time_base: stream.time_base,
            frame_rate: stream.frame_rate,
            duration_ms: stream
                .duration
                .filter(|_| stream.time_base.is_valid())
                .map(|ticks| rescale(ticks, stream.time_base, Rational::MILLISECONDS)),
            width: stream.codec.width,
            height: stream.codec.height,
            sample_rate: stream.codec.sample_rate,
            channels: stream.codec.channels,
            bit_rate: stream.codec.bit_rate,
            rotation_degrees: stream.rotation_degrees,
        }
    }
}

/// What [`probe`] found in a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub locator: String,
    /// Container duration, falling back to the longest stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    pub streams: Vec<StreamSummary>,
}

impl MediaInfo {
    pub fn duration_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    fn first(&self, kind: MediaKind) -> Option<&StreamSummary> {
        self.streams.iter().find(|s| s.kind == kind)
    }

    /// Width and height of the first video stream.
    pub fn video_size(&self) -> Option<(u32, u32)> {
        self.first(MediaKind::Video).map(|s| (s.width, s.height))
    }

    pub fn video_codec_name(&self) -> Option<&str> {
        self.first(MediaKind::Video).map(|s| s.codec_name.as_str())
    }

    /// Display rotation of the first video stream; 0 when undeclared.
    pub fn rotation_degrees(&self) -> Option<f64> {
        self.first(MediaKind::Video)
            .map(|s| s.rotation_degrees.unwrap_or(0.0))
    }

    /// Declared bit rate of the first audio stream.
    pub fn audio_bitrate(&self) -> Option<u64> {
        self.first(MediaKind::Audio).map(|s| s.bit_rate)
    }
}

/// Open `locator` through `backend`, describe it and release it.
pub fn probe(backend: &dyn MediaBackend, locator: &str) -> Result<MediaInfo> {
    let mut source = ScopedResource::new(backend.open_source(locator)?, "probe source");

    let streams: Vec<StreamSummary> = source.streams().iter().map(StreamSummary::from).collect();
    let duration_ms = source
        .duration()
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .or_else(|| streams.iter().filter_map(|s| s.duration_ms).max());

    tracing::debug!(locator, streams = streams.len(), ?duration_ms, "Probed");
    source.close()?;

    Ok(MediaInfo {
        locator: locator.to_string(),
        duration_ms,
        streams,
    })
}
