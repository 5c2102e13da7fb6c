// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Merge one video-only and one audio-only source into a single container.

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::config::{EndPolicy, RemuxConfig};
use super::cursor::{InterleaveCursor, Side};
use super::synthetic::SyntheticTimestamps;
use crate::core::cancel::{cancellable_loop, CancelFlag, LoopControl, LoopExit};
use crate::core::error::RemuxError;
use crate::core::media::{Closeable, MediaBackend, MediaSink, MediaSource, ScopedResource};
use crate::core::packet::Packet;
use crate::core::stream::{first_of_kind, MediaKind, StreamInfo};
use crate::core::time_base::{rescale, rescale_timestamp, Rational};

/// Outcome of a completed remux session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemuxReport {
    pub video_packets: u64,
    pub audio_packets: u64,
    /// Packets whose timestamps were invented.
    pub synthesized_video: u64,
    pub synthesized_audio: u64,
    /// Packets whose DTS was clamped to their PTS.
    pub dts_repaired: u64,
    /// Packets read from streams that are not being copied.
    pub skipped_packets: u64,
    /// Collaborators whose release reported an error.
    pub close_failures: u32,
}

impl RemuxReport {
    pub fn packets_written(&self) -> u64 {
        self.video_packets + self.audio_packets
    }
}

/// Runs remux sessions with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Remuxer {
    config: RemuxConfig,
    cancel: Option<CancelFlag>,
}

impl Remuxer {
    pub fn new(config: RemuxConfig) -> Self {
        Self { config, cancel: None }
    }

    /// Stop between packets once `flag` is raised.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &RemuxConfig {
        &self.config
    }

    /// Copy every packet of the first video stream of `video` and the first
    /// audio stream of `audio` into `sink`.
    ///
    /// All three collaborators are released exactly once before this returns,
    /// in the order video source, audio source, sink. A release failure is
    /// logged and counted; it never replaces an earlier error.
    pub fn remux(
        &self,
        video: Box<dyn MediaSource>,
        audio: Box<dyn MediaSource>,
        sink: Box<dyn MediaSink>,
    ) -> Result<RemuxReport, RemuxError> {
        let mut session = Session {
            video: ScopedResource::new(video, "video source"),
            audio: ScopedResource::new(audio, "audio source"),
            sink: ScopedResource::new(sink, "sink"),
        };

        let cancel = self.cancel.clone().unwrap_or_default();
        let outcome = session.run(&self.config, &cancel);
        let close_failures = session.release();

        match outcome {
            Ok(mut report) => {
                report.close_failures = close_failures;
                info!(
                    video_packets = report.video_packets,
                    audio_packets = report.audio_packets,
                    synthesized = report.synthesized_video + report.synthesized_audio,
                    dts_repaired = report.dts_repaired,
                    "Remux complete"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "Remux failed");
                Err(e)
            }
        }
    }

    /// Open both sources and the sink through `backend`, then [`Self::remux`].
    pub fn remux_locators(
        &self,
        backend: &dyn MediaBackend,
        video_locator: &str,
        audio_locator: &str,
        output_locator: &str,
    ) -> Result<RemuxReport, RemuxError> {
        let mut video = open_source(backend, video_locator)?;
        let mut audio = match open_source(backend, audio_locator) {
            Ok(audio) => audio,
            Err(e) => {
                release_logged(&mut video, "video source");
                return Err(e);
            }
        };
        let sink = match backend.create_sink(output_locator, self.config.container_hint.as_deref()) {
            Ok(sink) => sink,
            Err(source) => {
                release_logged(&mut video, "video source");
                release_logged(&mut audio, "audio source");
                return Err(RemuxError::SinkOpenFailed {
                    locator: output_locator.to_string(),
                    source,
                });
            }
        };

        self.remux(video, audio, sink)
    }
}

/// [`Remuxer::remux`] with the default configuration.
pub fn remux(
    video: Box<dyn MediaSource>,
    audio: Box<dyn MediaSource>,
    sink: Box<dyn MediaSink>,
) -> Result<RemuxReport, RemuxError> {
    Remuxer::default().remux(video, audio, sink)
}

/// Open, remux and release in one call.
pub fn remux_files(
    backend: &dyn MediaBackend,
    video_locator: &str,
    audio_locator: &str,
    output_locator: &str,
    config: RemuxConfig,
) -> Result<RemuxReport, RemuxError> {
    Remuxer::new(config).remux_locators(backend, video_locator, audio_locator, output_locator)
}

fn open_source(backend: &dyn MediaBackend, locator: &str) -> Result<Box<dyn MediaSource>, RemuxError> {
    backend
        .open_source(locator)
        .map_err(|source| RemuxError::SourceOpenFailed {
            locator: locator.to_string(),
            source,
        })
}

fn release_logged<R: Closeable + ?Sized>(resource: &mut R, label: &str) {
    if let Err(e) = resource.close() {
        warn!(resource = label, error = %e, "Release failed");
    }
}

/// Per-input state of a running session.
struct Lane {
    kind: MediaKind,
    input_index: usize,
    input_time_base: Rational,
    output_index: usize,
    output_time_base: Rational,
    synthetic: SyntheticTimestamps,
    written: u64,
    synthesized: u64,
}

impl Lane {
    fn new(stream: &StreamInfo, output_index: usize, config: &RemuxConfig) -> Self {
        let usable = |rate: &Rational| rate.num > 0 && rate.den > 0;
        let frame_rate = match stream.frame_rate.filter(usable) {
            Some(rate) => rate,
            None if usable(&config.fallback_frame_rate) => config.fallback_frame_rate,
            None => {
                warn!(rate = %config.fallback_frame_rate, "Unusable fallback frame rate, using 25/1");
                Rational::new(25, 1)
            }
        };
        Self {
            kind: stream.kind,
            input_index: stream.index,
            input_time_base: stream.time_base,
            output_index,
            output_time_base: stream.time_base,
            synthetic: SyntheticTimestamps::new(frame_rate, stream.time_base),
            written: 0,
            synthesized: 0,
        }
    }
}

struct Session {
    video: ScopedResource<Box<dyn MediaSource>>,
    audio: ScopedResource<Box<dyn MediaSource>>,
    sink: ScopedResource<Box<dyn MediaSink>>,
}

impl Session {
    fn run(&mut self, config: &RemuxConfig, cancel: &CancelFlag) -> Result<RemuxReport, RemuxError> {
        let video_stream = select_stream(&**self.video, MediaKind::Video)?;
        let audio_stream = select_stream(&**self.audio, MediaKind::Audio)?;

        info!(
            video = %self.video.locator(),
            video_codec = %video_stream.codec.codec_name,
            video_time_base = %video_stream.time_base,
            audio = %self.audio.locator(),
            audio_codec = %audio_stream.codec.codec_name,
            audio_time_base = %audio_stream.time_base,
            output = %self.sink.locator(),
            "Starting remux"
        );

        let video_out = self.add_output(&video_stream)?;
        let audio_out = self.add_output(&audio_stream)?;
        let mut video = Lane::new(&video_stream, video_out, config);
        let mut audio = Lane::new(&audio_stream, audio_out, config);

        self.sink.write_header().map_err(RemuxError::HeaderWriteFailed)?;

        for lane in [&mut video, &mut audio] {
            if let Some(tb) = self.sink.stream_time_base(lane.output_index) {
                lane.output_time_base = tb;
            }
            debug!(
                kind = %lane.kind,
                input_time_base = %lane.input_time_base,
                output_time_base = %lane.output_time_base,
                "Output stream ready"
            );
        }

        let mut report = RemuxReport::default();
        let pumped = self.pump(config, cancel, &mut video, &mut audio, &mut report);

        report.video_packets = video.written;
        report.audio_packets = audio.written;
        report.synthesized_video = video.synthesized;
        report.synthesized_audio = audio.synthesized;

        // The header is down, so a trailer is owed whatever happened since.
        let trailer = self.sink.write_trailer();

        match (pumped, trailer) {
            (Ok(()), Ok(())) => Ok(report),
            (Ok(()), Err(source)) => Err(RemuxError::TrailerWriteFailed {
                packets_written: report.packets_written(),
                source,
            }),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(trailer_err)) => {
                warn!(error = %trailer_err, "Trailer write failed after earlier error");
                Err(e)
            }
        }
    }

    fn add_output(&mut self, stream: &StreamInfo) -> Result<usize, RemuxError> {
        self.sink
            .add_stream(stream.kind, &stream.codec, stream.time_base)
            .map_err(|source| RemuxError::StreamSetupFailed {
                kind: stream.kind,
                source,
            })
    }

    fn pump(
        &mut self,
        config: &RemuxConfig,
        cancel: &CancelFlag,
        video: &mut Lane,
        audio: &mut Lane,
        report: &mut RemuxReport,
    ) -> Result<(), RemuxError> {
        let mut cursor = InterleaveCursor::new(video.input_time_base, audio.input_time_base);

        let exit = cancellable_loop(cancel, || {
            let Some(side) = cursor.next_side() else {
                return Ok(LoopControl::Break);
            };
            let lane = match side {
                Side::Video => &mut *video,
                Side::Audio => &mut *audio,
            };

            let Some(mut packet) = self.read_selected(side, lane, report)? else {
                debug!(kind = %lane.kind, packets = lane.written, "Source exhausted");
                if config.end_policy == EndPolicy::Shortest {
                    return Ok(LoopControl::Break);
                }
                cursor.mark_exhausted(side);
                return Ok(LoopControl::Continue);
            };

            let (pts, invented) = lane.synthetic.stamp(&mut packet);
            if invented {
                lane.synthesized += 1;
            }
            let dts = match packet.dts {
                Some(dts) if config.repair_dts && dts > pts => {
                    warn!(kind = %lane.kind, pts, dts, "DTS after PTS, clamping");
                    report.dts_repaired += 1;
                    pts
                }
                Some(dts) => dts,
                None => pts,
            };
            cursor.advance(side, pts);

            packet.pts = Some(rescale_timestamp(pts, lane.input_time_base, lane.output_time_base));
            packet.dts = Some(rescale_timestamp(dts, lane.input_time_base, lane.output_time_base));
            packet.duration = rescale(packet.duration, lane.input_time_base, lane.output_time_base);
            packet.pos = -1;
            packet.stream_index = lane.output_index;

            trace!(
                kind = %lane.kind,
                pts = ?packet.pts,
                dts = ?packet.dts,
                size = packet.size(),
                "Writing packet"
            );

            let packet_number = lane.written + 1;
            self.sink
                .write_packet(packet)
                .map_err(|source| RemuxError::MuxWriteFailed {
                    kind: lane.kind,
                    packet_number,
                    source,
                })?;
            lane.written = packet_number;
            Ok(LoopControl::Continue)
        })?;

        match exit {
            LoopExit::Completed => Ok(()),
            LoopExit::Cancelled => {
                let packets_written = video.written + audio.written;
                info!(packets_written, "Remux cancelled");
                Err(RemuxError::Cancelled { packets_written })
            }
        }
    }

    /// Next packet of the selected stream on `side`; packets of other streams
    /// are dropped.
    fn read_selected(
        &mut self,
        side: Side,
        lane: &Lane,
        report: &mut RemuxReport,
    ) -> Result<Option<Packet>, RemuxError> {
        let source = match side {
            Side::Video => &mut self.video,
            Side::Audio => &mut self.audio,
        };
        loop {
            match source.read_packet() {
                Ok(Some(packet)) if packet.stream_index == lane.input_index => return Ok(Some(packet)),
                Ok(Some(packet)) => {
                    trace!(stream = packet.stream_index, "Skipping packet of unselected stream");
                    report.skipped_packets += 1;
                }
                Ok(None) => return Ok(None),
                Err(source) => {
                    return Err(RemuxError::ReadFailed {
                        kind: lane.kind,
                        source,
                    });
                }
            }
        }
    }

    /// Release video source, audio source, then sink. Returns the number of
    /// failed releases.
    fn release(&mut self) -> u32 {
        let mut failures = 0;
        let results = [
            (self.video.label().to_string(), self.video.close()),
            (self.audio.label().to_string(), self.audio.close()),
            (self.sink.label().to_string(), self.sink.close()),
        ];
        for (label, result) in results {
            if let Err(e) = result {
                warn!(resource = %label, error = %e, "Release failed");
                failures += 1;
            }
        }
        failures
    }
}

fn select_stream(source: &dyn MediaSource, kind: MediaKind) -> Result<StreamInfo, RemuxError> {
    first_of_kind(source.streams(), kind)
        .cloned()
        .ok_or_else(|| RemuxError::NoStreamFound {
            kind,
            origin: source.locator().to_string(),
        })
}
