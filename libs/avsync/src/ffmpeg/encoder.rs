// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! H.264 encoding through libavcodec (libx264 when available).

use std::collections::VecDeque;

use ffmpeg_next as ffmpeg;
use ffmpeg::codec::encoder::video::Encoder;
use ffmpeg::util::frame::Video as VideoFrame;
use ffmpeg::{codec, encoder, format, Dictionary};

use super::{packet_from_av, AvCodecParameters};
use crate::core::frame::YuvFrame;
use crate::core::media::{Closeable, EncoderParams, VideoEncoder};
use crate::core::packet::Packet;
use crate::core::stream::{CodecParameters, NativeParameters};
use crate::core::{MediaError, Result};

/// YUV 4:2:0 in, H.264 packets out.
///
/// Every packet libavcodec has ready after a frame is received at once and
/// queued, then handed out one per `encode`/`flush` call in order.
pub struct FfmpegVideoEncoder {
    encoder: Option<Encoder>,
    params: EncoderParams,
    pending: VecDeque<Packet>,
    eof_sent: bool,
}

impl FfmpegVideoEncoder {
    pub fn open(params: &EncoderParams) -> Result<Self> {
        let codec = encoder::find_by_name("libx264")
            .or_else(|| encoder::find(codec::Id::H264))
            .ok_or_else(|| MediaError::NotSupported("no H.264 encoder in this libav build".into()))?;
        let codec_name = codec.name().to_string();

        let mut video = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| MediaError::Codec(format!("encoder context: {e}")))?;
        video.set_width(params.width);
        video.set_height(params.height);
        video.set_format(format::Pixel::YUV420P);
        video.set_time_base(params.time_base);
        video.set_frame_rate(Some(params.frame_rate));
        video.set_bit_rate(params.bitrate_bps as usize);
        video.set_gop(params.keyframe_interval_frames);
        if params.zero_latency {
            video.set_max_b_frames(0);
        }
        if params.global_header {
            video.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut opts = Dictionary::new();
        opts.set("qmin", &params.qmin.to_string());
        opts.set("qmax", &params.qmax.to_string());
        if params.zero_latency {
            opts.set("preset", "superfast");
            opts.set("tune", "zerolatency");
        }

        let encoder = video
            .open_with(opts)
            .map_err(|e| MediaError::Codec(format!("open {codec_name}: {e}")))?;

        tracing::info!(
            codec = %codec_name,
            width = params.width,
            height = params.height,
            bitrate_bps = params.bitrate_bps,
            "Opened video encoder"
        );

        Ok(Self {
            encoder: Some(encoder),
            params: params.clone(),
            pending: VecDeque::new(),
            eof_sent: false,
        })
    }

    fn encoder(&mut self) -> Result<&mut Encoder> {
        self.encoder
            .as_mut()
            .ok_or_else(|| MediaError::Closed("video encoder".into()))
    }

    /// Move every packet the codec has ready into the queue.
    fn receive_all(&mut self) -> Result<()> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(MediaError::Closed("video encoder".into()));
        };
        while let Some(packet) = receive(encoder)? {
            self.pending.push_back(packet);
        }
        if self.pending.len() > 1 {
            tracing::trace!(queued = self.pending.len(), "Encoder produced several packets");
        }
        Ok(())
    }

    fn to_av_frame(&self, yuv: &YuvFrame) -> VideoFrame {
        let mut frame = VideoFrame::new(format::Pixel::YUV420P, yuv.width, yuv.height);
        let chroma_width = yuv.width.div_ceil(2) as usize;
        let chroma_height = yuv.height.div_ceil(2) as usize;
        copy_plane(&mut frame, 0, &yuv.y, yuv.width as usize, yuv.height as usize);
        copy_plane(&mut frame, 1, &yuv.u, chroma_width, chroma_height);
        copy_plane(&mut frame, 2, &yuv.v, chroma_width, chroma_height);
        frame.set_pts(Some(yuv.pts));
        frame
    }
}

/// Copy a tightly packed plane into a frame plane with its own stride.
fn copy_plane(frame: &mut VideoFrame, plane: usize, src: &[u8], width: usize, height: usize) {
    let stride = frame.stride(plane);
    let dst = frame.data_mut(plane);
    for (row, line) in src.chunks_exact(width).take(height).enumerate() {
        let start = row * stride;
        dst[start..start + width].copy_from_slice(line);
    }
}

fn receive(encoder: &mut Encoder) -> Result<Option<Packet>> {
    let mut pkt = ffmpeg::Packet::empty();
    match encoder.receive_packet(&mut pkt) {
        Ok(()) => Ok(Some(packet_from_av(&pkt))),
        Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => Ok(None),
        Err(ffmpeg::Error::Eof) => Ok(None),
        Err(e) => Err(MediaError::Codec(format!("receive packet: {e}"))),
    }
}

impl Closeable for FfmpegVideoEncoder {
    fn close(&mut self) -> Result<()> {
        match self.encoder.take() {
            Some(encoder) => {
                self.pending.clear();
                drop(encoder);
                tracing::debug!("Closed video encoder");
                Ok(())
            }
            None => Err(MediaError::Closed("video encoder".into())),
        }
    }
}

impl VideoEncoder for FfmpegVideoEncoder {
    fn codec_parameters(&self) -> CodecParameters {
        let native = self
            .encoder
            .as_ref()
            .map(|e| NativeParameters::new(AvCodecParameters(codec::Parameters::from(e))));
        CodecParameters {
            codec_name: "h264".to_string(),
            width: self.params.width,
            height: self.params.height,
            bit_rate: u64::from(self.params.bitrate_bps),
            native,
            ..Default::default()
        }
    }

    fn encode(&mut self, frame: &YuvFrame) -> Result<Option<Packet>> {
        let av_frame = self.to_av_frame(frame);
        self.encoder()?
            .send_frame(&av_frame)
            .map_err(|e| MediaError::Codec(format!("send frame {}: {e}", frame.pts)))?;
        self.receive_all()?;
        Ok(self.pending.pop_front())
    }

    fn flush(&mut self) -> Result<Option<Packet>> {
        if let Some(packet) = self.pending.pop_front() {
            return Ok(Some(packet));
        }
        if !self.eof_sent {
            self.eof_sent = true;
            self.encoder()?
                .send_eof()
                .map_err(|e| MediaError::Codec(format!("send eof: {e}")))?;
            self.receive_all()?;
        }
        Ok(self.pending.pop_front())
    }
}

// FfmpegVideoEncoder is Send because the codec context is only used from the
// thread that owns the session.
unsafe impl Send for FfmpegVideoEncoder {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::PixelLayout;
    use crate::core::live::LivePushConfig;

    #[test]
    #[ignore] // Requires libav with an H.264 encoder
    fn test_every_frame_comes_out_once() {
        ffmpeg::init().unwrap();
        // Lookahead and B-frames on, so packets leave the codec unevenly.
        let mut params = LivePushConfig::new(64, 48).encoder_params();
        params.zero_latency = false;
        let mut encoder = FfmpegVideoEncoder::open(&params).unwrap();

        let raw = vec![0x80u8; PixelLayout::I420.frame_size(64, 48)];
        let mut packets = Vec::new();
        for pts in 0..60 {
            let frame = YuvFrame::from_raw(&raw, 64, 48, PixelLayout::I420, pts).unwrap();
            packets.extend(encoder.encode(&frame).unwrap());
        }
        while let Some(packet) = encoder.flush().unwrap() {
            packets.push(packet);
        }

        assert_eq!(packets.len(), 60);
        assert!(packets[0].is_keyframe);
        assert_eq!(encoder.flush().unwrap(), None);
        encoder.close().unwrap();
    }
}
