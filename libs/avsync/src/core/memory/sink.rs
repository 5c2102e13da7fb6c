// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use parking_lot::Mutex;

use super::CloseLog;
use crate::core::media::{Closeable, MediaSink};
use crate::core::packet::Packet;
use crate::core::stream::{CodecParameters, MediaKind};
use crate::core::time_base::Rational;
use crate::core::{MediaError, Result};

/// Output stream as created on a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStream {
    pub kind: MediaKind,
    pub codec_name: String,
    pub requested_time_base: Rational,
    pub time_base: Rational,
}

/// Everything a sink was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Header,
    Packet { stream_index: usize, pts: Option<i64> },
    Trailer,
}

#[derive(Debug, Default)]
struct Recording {
    container_hint: Option<String>,
    streams: Vec<RecordedStream>,
    packets: Vec<Packet>,
    events: Vec<SinkEvent>,
}

/// Shared view of what a [`MemorySink`] received. Stays readable after the
/// sink was moved into a session and released.
#[derive(Debug, Clone, Default)]
pub struct SinkRecording {
    inner: Arc<Mutex<Recording>>,
}

impl SinkRecording {
    pub fn container_hint(&self) -> Option<String> {
        self.inner.lock().container_hint.clone()
    }

    pub fn streams(&self) -> Vec<RecordedStream> {
        self.inner.lock().streams.clone()
    }

    pub fn packets(&self) -> Vec<Packet> {
        self.inner.lock().packets.clone()
    }

    /// Packets of one output stream, in write order.
    pub fn packets_for(&self, stream_index: usize) -> Vec<Packet> {
        self.inner
            .lock()
            .packets
            .iter()
            .filter(|p| p.stream_index == stream_index)
            .cloned()
            .collect()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.inner.lock().events.clone()
    }

    pub fn header_written(&self) -> bool {
        self.inner.lock().events.contains(&SinkEvent::Header)
    }

    pub fn trailer_written(&self) -> bool {
        self.inner.lock().events.contains(&SinkEvent::Trailer)
    }
}

/// Sink that records instead of muxing.
#[derive(Debug)]
pub struct MemorySink {
    locator: String,
    recording: SinkRecording,
    forced_time_base: Option<Rational>,
    fail_header: bool,
    fail_packet_at: Option<u64>,
    fail_trailer: bool,
    fail_close: bool,
    packets_seen: u64,
    closed: bool,
    close_log: CloseLog,
}

impl MemorySink {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            recording: SinkRecording::default(),
            forced_time_base: None,
            fail_header: false,
            fail_packet_at: None,
            fail_trailer: false,
            fail_close: false,
            packets_seen: 0,
            closed: false,
            close_log: CloseLog::new(),
        }
    }

    /// Handle for inspecting the output later.
    pub fn recording(&self) -> SinkRecording {
        self.recording.clone()
    }

    /// Pick `time_base` for every stream at header time, the way FLV forces
    /// milliseconds.
    pub fn with_time_base(mut self, time_base: Rational) -> Self {
        self.forced_time_base = Some(time_base);
        self
    }

    pub fn fail_header(mut self) -> Self {
        self.fail_header = true;
        self
    }

    /// Make the `n`-th packet write (1-based) fail.
    pub fn fail_packet_at(mut self, n: u64) -> Self {
        self.fail_packet_at = Some(n);
        self
    }

    pub fn fail_trailer(mut self) -> Self {
        self.fail_trailer = true;
        self
    }

    pub fn fail_on_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn with_close_log(mut self, log: CloseLog) -> Self {
        self.close_log = log;
        self
    }

    pub(crate) fn set_close_log(&mut self, log: CloseLog) {
        self.close_log = log;
    }

    pub(crate) fn set_container_hint(&mut self, hint: Option<&str>) {
        self.recording.inner.lock().container_hint = hint.map(str::to_string);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(MediaError::Closed(self.locator.clone()))
        } else {
            Ok(())
        }
    }
}

impl Closeable for MemorySink {
    fn close(&mut self) -> Result<()> {
        self.close_log.record(&self.locator);
        if self.closed {
            return Err(MediaError::Closed(self.locator.clone()));
        }
        self.closed = true;
        if self.fail_close {
            return Err(MediaError::Write(format!("scripted close failure on {}", self.locator)));
        }
        Ok(())
    }
}

impl MediaSink for MemorySink {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn add_stream(&mut self, kind: MediaKind, codec: &CodecParameters, time_base: Rational) -> Result<usize> {
        self.ensure_open()?;
        let mut rec = self.recording.inner.lock();
        if rec.events.contains(&SinkEvent::Header) {
            return Err(MediaError::InvalidData("stream added after header".into()));
        }
        rec.streams.push(RecordedStream {
            kind,
            codec_name: codec.codec_name.clone(),
            requested_time_base: time_base,
            time_base,
        });
        Ok(rec.streams.len() - 1)
    }

    fn write_header(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.fail_header {
            return Err(MediaError::Write("scripted header failure".into()));
        }
        let mut rec = self.recording.inner.lock();
        if let Some(tb) = self.forced_time_base {
            for stream in &mut rec.streams {
                stream.time_base = tb;
            }
        }
        rec.events.push(SinkEvent::Header);
        Ok(())
    }

    fn stream_time_base(&self, index: usize) -> Option<Rational> {
        self.recording.inner.lock().streams.get(index).map(|s| s.time_base)
    }

    fn write_packet(&mut self, packet: Packet) -> Result<()> {
        self.ensure_open()?;
        self.packets_seen += 1;
        if self.fail_packet_at == Some(self.packets_seen) {
            return Err(MediaError::Write(format!("scripted failure on packet #{}", self.packets_seen)));
        }
        let mut rec = self.recording.inner.lock();
        if packet.stream_index >= rec.streams.len() {
            return Err(MediaError::InvalidData(format!("no output stream {}", packet.stream_index)));
        }
        rec.events.push(SinkEvent::Packet {
            stream_index: packet.stream_index,
            pts: packet.pts,
        });
        rec.packets.push(packet);
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.fail_trailer {
            return Err(MediaError::Write("scripted trailer failure".into()));
        }
        self.recording.inner.lock().events.push(SinkEvent::Trailer);
        Ok(())
    }
}
