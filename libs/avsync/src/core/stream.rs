// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Stream metadata shared by sources, sinks and encoders.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::time_base::Rational;

/// Kind of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    /// Subtitles, data tracks, attachments.
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Backend-specific codec parameters carried alongside the portable fields.
///
/// A sink created by the same backend as the source downcasts this to copy
/// the parameters bit-for-bit (extradata, profile, tags). Other sinks ignore
/// it.
#[derive(Clone)]
pub struct NativeParameters(Arc<dyn Any + Send + Sync>);

impl NativeParameters {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for NativeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeParameters(..)")
    }
}

/// Codec description of one stream.
#[derive(Debug, Clone, Default)]
pub struct CodecParameters {
    /// Short codec name, e.g. `h264`, `aac`.
    pub codec_name: String,
    pub width: u32,
    pub height: u32,
    pub sample_rate: u32,
    pub channels: u16,
    /// Declared bit rate in bits per second, 0 when unknown.
    pub bit_rate: u64,
    pub native: Option<NativeParameters>,
}

/// One stream as seen in a source container or created on a sink.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Position within the owning container.
    pub index: usize,
    pub kind: MediaKind,
    pub time_base: Rational,
    /// Nominal frame rate, when the container declares one.
    pub frame_rate: Option<Rational>,
    /// Stream length in `time_base` ticks.
    pub duration: Option<i64>,
    /// Display rotation from the container's side data.
    pub rotation_degrees: Option<f64>,
    pub codec: CodecParameters,
}

impl StreamInfo {
    pub fn video(index: usize, time_base: Rational, codec_name: &str, width: u32, height: u32) -> Self {
        Self {
            index,
            kind: MediaKind::Video,
            time_base,
            frame_rate: None,
            duration: None,
            rotation_degrees: None,
            codec: CodecParameters {
                codec_name: codec_name.to_string(),
                width,
                height,
                ..Default::default()
            },
        }
    }

    pub fn audio(index: usize, time_base: Rational, codec_name: &str, sample_rate: u32, channels: u16) -> Self {
        Self {
            index,
            kind: MediaKind::Audio,
            time_base,
            frame_rate: None,
            duration: None,
            rotation_degrees: None,
            codec: CodecParameters {
                codec_name: codec_name.to_string(),
                sample_rate,
                channels,
                ..Default::default()
            },
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn with_duration(mut self, ticks: i64) -> Self {
        self.duration = Some(ticks);
        self
    }

    pub fn with_bit_rate(mut self, bit_rate: u64) -> Self {
        self.codec.bit_rate = bit_rate;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = Some(degrees);
        self
    }
}

/// First stream of `kind`, in container order.
pub fn first_of_kind(streams: &[StreamInfo], kind: MediaKind) -> Option<&StreamInfo> {
    streams.iter().find(|s| s.kind == kind)
}
