// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use super::{CloseLog, MemorySink, MemorySource, ScriptedEncoder, SinkRecording};
use crate::core::media::{EncoderParams, MediaBackend, MediaSink, MediaSource, VideoEncoder};
use crate::core::{MediaError, Result};

/// [`MediaBackend`] over registered in-memory collaborators.
///
/// Sources are cloned on every open. A sink registered for a locator is
/// handed out once; any other locator gets a fresh recording sink. Every
/// collaborator reports its closes into the backend's [`CloseLog`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sources: Mutex<HashMap<String, MemorySource>>,
    sinks: Mutex<HashMap<String, MemorySink>>,
    recordings: Mutex<HashMap<String, SinkRecording>>,
    refused_sinks: Mutex<HashSet<String>>,
    encoders: Mutex<Vec<EncoderParams>>,
    encoder_delay: usize,
    fail_encoder_open: bool,
    fail_encode_at: Option<u64>,
    close_log: CloseLog,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, source: MemorySource) -> Self {
        self.add_source(source);
        self
    }

    pub fn with_sink(self, sink: MemorySink) -> Self {
        self.add_sink(sink);
        self
    }

    /// Frames every opened encoder holds back before its first packet.
    pub fn with_encoder_delay(mut self, frames: usize) -> Self {
        self.encoder_delay = frames;
        self
    }

    pub fn fail_encoder_open(mut self) -> Self {
        self.fail_encoder_open = true;
        self
    }

    /// Opened encoders fail on their `n`-th frame.
    pub fn fail_encode_at(mut self, n: u64) -> Self {
        self.fail_encode_at = Some(n);
        self
    }

    /// Refuse to create a sink for `locator`.
    pub fn refuse_sink(self, locator: impl Into<String>) -> Self {
        self.refused_sinks.lock().insert(locator.into());
        self
    }

    pub fn add_source(&self, mut source: MemorySource) {
        source.set_close_log(self.close_log.clone());
        self.sources.lock().insert(source.locator().to_string(), source);
    }

    pub fn add_sink(&self, mut sink: MemorySink) {
        sink.set_close_log(self.close_log.clone());
        let locator = sink.locator().to_string();
        self.recordings.lock().insert(locator.clone(), sink.recording());
        self.sinks.lock().insert(locator, sink);
    }

    pub fn close_log(&self) -> CloseLog {
        self.close_log.clone()
    }

    /// Output recorded for a sink locator, once that sink exists.
    pub fn recording(&self, locator: &str) -> Option<SinkRecording> {
        self.recordings.lock().get(locator).cloned()
    }

    /// Parameters of every encoder opened so far.
    pub fn opened_encoders(&self) -> Vec<EncoderParams> {
        self.encoders.lock().clone()
    }
}

impl MediaBackend for MemoryBackend {
    fn open_source(&self, locator: &str) -> Result<Box<dyn MediaSource>> {
        let source = self.sources.lock().get(locator).cloned().ok_or_else(|| MediaError::Open {
            locator: locator.to_string(),
            reason: "no such source".into(),
        })?;
        Ok(Box::new(source))
    }

    fn create_sink(&self, locator: &str, container_hint: Option<&str>) -> Result<Box<dyn MediaSink>> {
        if self.refused_sinks.lock().contains(locator) {
            return Err(MediaError::Open {
                locator: locator.to_string(),
                reason: "sink refused".into(),
            });
        }
        let mut sink = match self.sinks.lock().remove(locator) {
            Some(sink) => sink,
            None => {
                let sink = MemorySink::new(locator).with_close_log(self.close_log.clone());
                self.recordings.lock().insert(locator.to_string(), sink.recording());
                sink
            }
        };
        sink.set_container_hint(container_hint);
        Ok(Box::new(sink))
    }

    fn open_video_encoder(&self, params: &EncoderParams) -> Result<Box<dyn VideoEncoder>> {
        if self.fail_encoder_open {
            return Err(MediaError::NotSupported(format!("encoder '{}'", params.codec_name)));
        }
        self.encoders.lock().push(params.clone());
        let mut encoder = ScriptedEncoder::new(params.clone(), self.encoder_delay).with_close_log(self.close_log.clone());
        if let Some(n) = self.fail_encode_at {
            encoder = encoder.fail_encode_at(n);
        }
        Ok(Box::new(encoder))
    }
}
