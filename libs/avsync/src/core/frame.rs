// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Raw camera buffers and planar YUV 4:2:0 frames.
//!
//! Capture devices hand out semi-planar 4:2:0 buffers: a full luma plane
//! followed by one plane of interleaved chroma pairs. Encoders want three
//! separate planes, so the chroma pairs are split before encoding.

use serde::{Deserialize, Serialize};

use super::{MediaError, Result};

/// Memory layout of a raw 4:2:0 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    /// Y plane, then interleaved V/U pairs (Android camera default).
    #[default]
    Nv21,
    /// Y plane, then interleaved U/V pairs.
    Nv12,
    /// Y, U and V planes back to back.
    I420,
}

impl PixelLayout {
    /// Exact byte length of one `width` x `height` frame.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        let luma = width as usize * height as usize;
        luma + 2 * chroma_plane_len(width, height)
    }
}

fn chroma_plane_len(width: u32, height: u32) -> usize {
    width.div_ceil(2) as usize * height.div_ceil(2) as usize
}

/// Planar YUV 4:2:0 frame as consumed by [`crate::core::VideoEncoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvFrame {
    pub width: u32,
    pub height: u32,
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
    /// Frame counter in the encoder's time base.
    pub pts: i64,
}

impl YuvFrame {
    /// Convert a raw capture buffer into planar form.
    pub fn from_raw(raw: &[u8], width: u32, height: u32, layout: PixelLayout, pts: i64) -> Result<Self> {
        let expected = layout.frame_size(width, height);
        if raw.len() != expected {
            return Err(MediaError::InvalidData(format!(
                "{layout:?} frame {width}x{height} needs {expected} bytes, got {}",
                raw.len()
            )));
        }

        let luma_len = width as usize * height as usize;
        let chroma_len = chroma_plane_len(width, height);
        let (y, chroma) = raw.split_at(luma_len);

        let (u, v) = match layout {
            PixelLayout::I420 => {
                let (u, v) = chroma.split_at(chroma_len);
                (u.to_vec(), v.to_vec())
            }
            PixelLayout::Nv21 => {
                let (v, u) = deinterleave_pairs(chroma, chroma_len);
                (u, v)
            }
            PixelLayout::Nv12 => deinterleave_pairs(chroma, chroma_len),
        };

        Ok(Self {
            width,
            height,
            y: y.to_vec(),
            u,
            v,
            pts,
        })
    }

    /// Concatenated planes (I420 order).
    pub fn to_i420(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.y.len() + self.u.len() + self.v.len());
        out.extend_from_slice(&self.y);
        out.extend_from_slice(&self.u);
        out.extend_from_slice(&self.v);
        out
    }
}

/// Split `a0 b0 a1 b1 ...` into `(a0 a1 ..., b0 b1 ...)`.
fn deinterleave_pairs(interleaved: &[u8], plane_len: usize) -> (Vec<u8>, Vec<u8>) {
    let mut first = Vec::with_capacity(plane_len);
    let mut second = Vec::with_capacity(plane_len);
    for pair in interleaved.chunks_exact(2) {
        first.push(pair[0]);
        second.push(pair[1]);
    }
    (first, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        assert_eq!(PixelLayout::Nv21.frame_size(4, 2), 8 + 4);
        assert_eq!(PixelLayout::I420.frame_size(500, 400), 300_000);
        // Odd sizes round the chroma planes up.
        assert_eq!(PixelLayout::Nv12.frame_size(3, 3), 9 + 2 * 4);
    }

    #[test]
    fn test_nv21_deinterleaves_v_first() {
        // 4x2 luma, 2x1 chroma: V0 U0 V1 U1
        let raw = [0, 1, 2, 3, 4, 5, 6, 7, 200, 100, 201, 101];
        let frame = YuvFrame::from_raw(&raw, 4, 2, PixelLayout::Nv21, 5).unwrap();
        assert_eq!(frame.y, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(frame.u, vec![100, 101]);
        assert_eq!(frame.v, vec![200, 201]);
        assert_eq!(frame.pts, 5);
        assert_eq!(frame.to_i420(), vec![0, 1, 2, 3, 4, 5, 6, 7, 100, 101, 200, 201]);
    }

    #[test]
    fn test_nv12_deinterleaves_u_first() {
        let raw = [9, 9, 9, 9, 10, 20];
        let frame = YuvFrame::from_raw(&raw, 2, 2, PixelLayout::Nv12, 0).unwrap();
        assert_eq!(frame.u, vec![10]);
        assert_eq!(frame.v, vec![20]);
    }

    #[test]
    fn test_i420_copies_planes() {
        let raw = [1, 1, 1, 1, 2, 3];
        let frame = YuvFrame::from_raw(&raw, 2, 2, PixelLayout::I420, 0).unwrap();
        assert_eq!(frame.u, vec![2]);
        assert_eq!(frame.v, vec![3]);
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        let err = YuvFrame::from_raw(&[0u8; 5], 2, 2, PixelLayout::Nv21, 0).unwrap_err();
        assert!(matches!(err, MediaError::InvalidData(_)));
    }
}
