// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Interleave cursor: which source to pull from next.

use std::cmp::Ordering;

use crate::core::time_base::{compare_ts, Rational};

/// One of the two remux inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Video,
    Audio,
}

/// Last timestamp taken from each source, each in its own source time base.
///
/// The side that is behind (or level, for video) is read next. Values stay in
/// source units so the comparison is exact.
#[derive(Debug, Clone)]
pub struct InterleaveCursor {
    video_time_base: Rational,
    audio_time_base: Rational,
    last_video_pts: i64,
    last_audio_pts: i64,
    video_exhausted: bool,
    audio_exhausted: bool,
}

impl InterleaveCursor {
    pub fn new(video_time_base: Rational, audio_time_base: Rational) -> Self {
        Self {
            video_time_base,
            audio_time_base,
            last_video_pts: 0,
            last_audio_pts: 0,
            video_exhausted: false,
            audio_exhausted: false,
        }
    }

    /// Side to read next, or `None` once both are exhausted.
    pub fn next_side(&self) -> Option<Side> {
        match (self.video_exhausted, self.audio_exhausted) {
            (true, true) => None,
            (false, true) => Some(Side::Video),
            (true, false) => Some(Side::Audio),
            (false, false) => {
                let order = compare_ts(
                    self.last_video_pts,
                    self.video_time_base,
                    self.last_audio_pts,
                    self.audio_time_base,
                );
                if order == Ordering::Greater {
                    Some(Side::Audio)
                } else {
                    Some(Side::Video)
                }
            }
        }
    }

    /// Record the source-unit timestamp of the packet just taken from `side`.
    pub fn advance(&mut self, side: Side, pts: i64) {
        match side {
            Side::Video => self.last_video_pts = pts,
            Side::Audio => self.last_audio_pts = pts,
        }
    }

    pub fn mark_exhausted(&mut self, side: Side) {
        match side {
            Side::Video => self.video_exhausted = true,
            Side::Audio => self.audio_exhausted = true,
        }
    }

    pub fn last_pts(&self, side: Side) -> i64 {
        match side {
            Side::Video => self.last_video_pts,
            Side::Audio => self.last_audio_pts,
        }
    }
}
