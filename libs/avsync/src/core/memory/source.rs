// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::VecDeque;
use std::time::Duration;

use super::CloseLog;
use crate::core::media::{Closeable, MediaSource};
use crate::core::packet::Packet;
use crate::core::stream::StreamInfo;
use crate::core::{MediaError, Result};

/// Source that replays a scripted packet list.
#[derive(Debug, Clone)]
pub struct MemorySource {
    locator: String,
    streams: Vec<StreamInfo>,
    packets: VecDeque<Packet>,
    duration: Option<Duration>,
    fail_read_at: Option<usize>,
    fail_close: bool,
    reads: usize,
    closed: bool,
    close_log: CloseLog,
}

impl MemorySource {
    pub fn new(locator: impl Into<String>, streams: Vec<StreamInfo>) -> Self {
        Self {
            locator: locator.into(),
            streams,
            packets: VecDeque::new(),
            duration: None,
            fail_read_at: None,
            fail_close: false,
            reads: 0,
            closed: false,
            close_log: CloseLog::new(),
        }
    }

    pub fn with_packets(mut self, packets: impl IntoIterator<Item = Packet>) -> Self {
        self.packets.extend(packets);
        self
    }

    pub fn push_packet(&mut self, packet: Packet) {
        self.packets.push_back(packet);
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Make the `n`-th read (1-based) fail.
    pub fn fail_read_at(mut self, n: usize) -> Self {
        self.fail_read_at = Some(n);
        self
    }

    /// Record the close, then report it as failed.
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

    pub fn remaining(&self) -> usize {
        self.packets.len()
    }
}

impl Closeable for MemorySource {
    fn close(&mut self) -> Result<()> {
        self.close_log.record(&self.locator);
        if self.closed {
            return Err(MediaError::Closed(self.locator.clone()));
        }
        self.closed = true;
        if self.fail_close {
            return Err(MediaError::Other(anyhow::anyhow!("scripted close failure on {}", self.locator)));
        }
        Ok(())
    }
}

impl MediaSource for MemorySource {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        if self.closed {
            return Err(MediaError::Closed(self.locator.clone()));
        }
        self.reads += 1;
        if self.fail_read_at == Some(self.reads) {
            return Err(MediaError::Read(format!("scripted failure on read #{}", self.reads)));
        }
        Ok(self.packets.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time_base::Rational;

    #[test]
    fn test_replays_then_ends() {
        let mut source = MemorySource::new("mem://v", vec![StreamInfo::video(0, Rational::new(1, 30), "h264", 2, 2)])
            .with_packets((0..3).map(|i| Packet::new(vec![i as u8], 0)));
        let mut n = 0;
        while source.read_packet().unwrap().is_some() {
            n += 1;
        }
        assert_eq!(n, 3);
        assert!(source.read_packet().unwrap().is_none());
    }

    #[test]
    fn test_scripted_read_failure_and_double_close() {
        let log = CloseLog::new();
        let mut source = MemorySource::new("mem://a", Vec::new())
            .with_packets([Packet::new(vec![1u8], 0)])
            .fail_read_at(1)
            .with_close_log(log.clone());
        assert!(matches!(source.read_packet(), Err(MediaError::Read(_))));
        source.close().unwrap();
        assert!(matches!(source.close(), Err(MediaError::Closed(_))));
        assert_eq!(log.count("mem://a"), 2);
    }
}
