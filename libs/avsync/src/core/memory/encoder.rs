// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::VecDeque;

use bytes::Bytes;

use super::CloseLog;
use crate::core::frame::YuvFrame;
use crate::core::media::{Closeable, EncoderParams, VideoEncoder};
use crate::core::packet::Packet;
use crate::core::stream::CodecParameters;
use crate::core::{MediaError, Result};

/// Encoder stand-in that holds back `delay` frames, like a codec with
/// lookahead, and emits one packet per frame after that.
///
/// Packet payloads are the frame's luma plane, so tests can tell frames
/// apart.
#[derive(Debug)]
pub struct ScriptedEncoder {
    params: EncoderParams,
    delay: usize,
    pending: VecDeque<Packet>,
    frames_in: u64,
    fail_encode_at: Option<u64>,
    label: String,
    closed: bool,
    close_log: CloseLog,
}

impl ScriptedEncoder {
    pub fn new(params: EncoderParams, delay: usize) -> Self {
        Self {
            params,
            delay,
            pending: VecDeque::new(),
            frames_in: 0,
            fail_encode_at: None,
            label: "encoder".to_string(),
            closed: false,
            close_log: CloseLog::new(),
        }
    }

    /// Make the `n`-th `encode` call (1-based) fail.
    pub fn fail_encode_at(mut self, n: u64) -> Self {
        self.fail_encode_at = Some(n);
        self
    }

    pub fn with_close_log(mut self, log: CloseLog) -> Self {
        self.close_log = log;
        self
    }

    /// Frames accepted but not yet emitted.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

impl Closeable for ScriptedEncoder {
    fn close(&mut self) -> Result<()> {
        self.close_log.record(&self.label);
        if self.closed {
            return Err(MediaError::Closed(self.label.clone()));
        }
        self.closed = true;
        Ok(())
    }
}

impl VideoEncoder for ScriptedEncoder {
    fn codec_parameters(&self) -> CodecParameters {
        CodecParameters {
            codec_name: self.params.codec_name.clone(),
            width: self.params.width,
            height: self.params.height,
            bit_rate: u64::from(self.params.bitrate_bps),
            ..Default::default()
        }
    }

    fn encode(&mut self, frame: &YuvFrame) -> Result<Option<Packet>> {
        if self.closed {
            return Err(MediaError::Closed(self.label.clone()));
        }
        if frame.width != self.params.width || frame.height != self.params.height {
            return Err(MediaError::InvalidData(format!(
                "frame {}x{} does not match encoder {}x{}",
                frame.width, frame.height, self.params.width, self.params.height
            )));
        }
        self.frames_in += 1;
        if self.fail_encode_at == Some(self.frames_in) {
            return Err(MediaError::Codec(format!("scripted failure on frame #{}", self.frames_in)));
        }

        let gop = u64::from(self.params.keyframe_interval_frames.max(1));
        let packet = Packet::new(Bytes::copy_from_slice(&frame.y), 0)
            .with_timestamp(frame.pts)
            .with_keyframe((self.frames_in - 1) % gop == 0);
        self.pending.push_back(packet);

        if self.pending.len() > self.delay {
            Ok(self.pending.pop_front())
        } else {
            Ok(None)
        }
    }

    fn flush(&mut self) -> Result<Option<Packet>> {
        if self.closed {
            return Err(MediaError::Closed(self.label.clone()));
        }
        Ok(self.pending.pop_front())
    }
}
