// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Compressed packet exchanged between sources, encoders and sinks.

use bytes::Bytes;

/// One unit of compressed data.
///
/// Timestamps are ticks in the time base of the stream the packet currently
/// belongs to: the originating stream until it is rescaled, the output stream
/// afterwards. `None` means the container did not declare one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: Bytes,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    /// Length in time base ticks, 0 when unknown.
    pub duration: i64,
    pub stream_index: usize,
    /// Byte offset in the originating container, -1 when unknown.
    pub pos: i64,
    pub is_keyframe: bool,
}

impl Packet {
    pub fn new(data: impl Into<Bytes>, stream_index: usize) -> Self {
        Self {
            data: data.into(),
            pts: None,
            dts: None,
            duration: 0,
            stream_index,
            pos: -1,
            is_keyframe: false,
        }
    }

    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn with_dts(mut self, dts: i64) -> Self {
        self.dts = Some(dts);
        self
    }

    /// Set PTS and DTS to the same value.
    pub fn with_timestamp(self, ts: i64) -> Self {
        self.with_pts(ts).with_dts(ts)
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_keyframe(mut self, is_keyframe: bool) -> Self {
        self.is_keyframe = is_keyframe;
        self
    }

    /// Returns the size of the payload in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// PTS, falling back to DTS.
    pub fn best_timestamp(&self) -> Option<i64> {
        self.pts.or(self.dts)
    }
}
