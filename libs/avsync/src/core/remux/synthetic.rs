// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Timestamps for packets whose container declares none (raw H.264, ADTS).

use crate::core::packet::Packet;
use crate::core::time_base::{FrameDuration, Rational};

/// Per-source counters for invented timestamps.
#[derive(Debug, Clone)]
pub struct SyntheticTimestamps {
    frame_duration: FrameDuration,
    frame_index: u64,
    last_pts: Option<i64>,
}

impl SyntheticTimestamps {
    pub fn new(frame_rate: Rational, time_base: Rational) -> Self {
        Self {
            frame_duration: FrameDuration::nominal(frame_rate, time_base),
            frame_index: 0,
            last_pts: None,
        }
    }

    /// Fill in PTS, DTS and duration when the packet has no PTS.
    ///
    /// Returns the packet's presentation timestamp (declared or invented) and
    /// whether it was invented.
    pub fn stamp(&mut self, packet: &mut Packet) -> (i64, bool) {
        if let Some(pts) = packet.pts {
            return (pts, false);
        }
        let pts = self.frame_duration.pts_for(self.frame_index);
        packet.pts = Some(pts);
        packet.dts = Some(pts);
        packet.duration = self.frame_duration.ticks();
        self.frame_index += 1;
        self.last_pts = Some(pts);
        (pts, true)
    }

    /// Packets stamped so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn last_pts(&self) -> Option<i64> {
        self.last_pts
    }

    pub fn frame_duration(&self) -> FrameDuration {
        self.frame_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invented_timestamps_step_by_one_frame() {
        let mut synth = SyntheticTimestamps::new(Rational::new(30, 1), Rational::MPEG_90K);
        let mut seen = Vec::new();
        for _ in 0..5 {
            let mut pkt = Packet::new(vec![0u8], 0);
            let (pts, invented) = synth.stamp(&mut pkt);
            assert!(invented);
            assert_eq!(pkt.dts, Some(pts));
            assert_eq!(pkt.duration, 3_000);
            seen.push(pts);
        }
        assert_eq!(seen, vec![0, 3_000, 6_000, 9_000, 12_000]);
        assert_eq!(synth.frame_index(), 5);
        assert_eq!(synth.last_pts(), Some(12_000));
    }

    #[test]
    fn test_coarse_time_base_keeps_frames_on_schedule() {
        let mut synth = SyntheticTimestamps::new(Rational::new(30, 1), Rational::MILLISECONDS);
        let stamped: Vec<i64> = (0..=30)
            .map(|_| {
                let mut pkt = Packet::new(vec![0u8], 0);
                synth.stamp(&mut pkt).0
            })
            .collect();
        assert_eq!(&stamped[..4], &[0, 33, 67, 100]);
        assert_eq!(stamped[30], 1_000);
        assert!(stamped.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_declared_timestamps_are_kept() {
        let mut synth = SyntheticTimestamps::new(Rational::new(25, 1), Rational::MILLISECONDS);
        let mut pkt = Packet::new(vec![0u8], 0).with_pts(400).with_dts(360);
        assert_eq!(synth.stamp(&mut pkt), (400, false));
        assert_eq!(pkt.dts, Some(360));
        assert_eq!(synth.frame_index(), 0);
    }

    #[test]
    fn test_missing_pts_overrides_declared_dts() {
        let mut synth = SyntheticTimestamps::new(Rational::new(25, 1), Rational::MILLISECONDS);
        let mut first = Packet::new(vec![0u8], 0);
        synth.stamp(&mut first);
        let mut pkt = Packet::new(vec![0u8], 0).with_dts(7);
        assert_eq!(synth.stamp(&mut pkt), (40, true));
        assert_eq!(pkt.dts, Some(40));
    }
}
