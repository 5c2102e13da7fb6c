// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Live push sessions over the in-memory backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use avsync::core::memory::{MemoryBackend, MemorySink, SinkEvent};
use avsync::{
    CancelFlag, Clock, LivePushConfig, LivePusher, ManualClock, PixelLayout, PushError, PusherState, Rational,
};

const URL: &str = "mem://live";

fn nv21(width: u32, height: u32, fill: u8) -> Vec<u8> {
    vec![fill; PixelLayout::Nv21.frame_size(width, height)]
}

fn manual_pusher(backend: &Arc<MemoryBackend>, config: LivePushConfig) -> (LivePusher, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let pusher = LivePusher::new(backend.clone(), config).with_clock(clock.clone());
    (pusher, clock)
}

/// Manual clock that raises a cancel flag while the pusher waits.
struct CancelDuringSleep {
    inner: ManualClock,
    flag: CancelFlag,
}

impl Clock for CancelDuringSleep {
    fn now_ns(&self) -> i64 {
        self.inner.now_ns()
    }

    fn sleep(&self, duration: Duration) {
        self.inner.sleep(duration);
        self.flag.cancel();
    }

    fn description(&self) -> &str {
        "cancel during sleep"
    }
}

fn pts_of(backend: &MemoryBackend) -> Vec<i64> {
    backend
        .recording(URL)
        .unwrap()
        .packets()
        .iter()
        .map(|p| p.pts.unwrap())
        .collect()
}

#[test]
fn test_thirty_frames_take_real_time() {
    let backend = Arc::new(MemoryBackend::new());
    let config = LivePushConfig::default().with_frame_rate(Rational::new(30, 1));
    let mut pusher = LivePusher::new(backend.clone(), config);

    let started = Instant::now();
    pusher.init(16, 16, URL).unwrap();
    let frame = nv21(16, 16, 0x80);
    for _ in 0..30 {
        pusher.push_frame(&frame).unwrap();
    }
    let elapsed = started.elapsed();
    pusher.stop().unwrap();

    assert!(
        elapsed >= Duration::from_millis(966),
        "30 frames at 30 fps finished after {elapsed:?}"
    );
    let pts = pts_of(&backend);
    assert_eq!(pts.len(), 30);
    let delta = pts[1] - pts[0];
    assert_eq!(delta, 3_000);
    assert!(pts.windows(2).all(|w| w[1] - w[0] == delta));
}

#[test]
fn test_pacing_sleeps_one_frame_per_packet() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut pusher, clock) = manual_pusher(&backend, LivePushConfig::default());

    pusher.init(4, 2, URL).unwrap();
    for _ in 0..5 {
        pusher.push_frame(&nv21(4, 2, 1)).unwrap();
    }

    // First packet is due at once, each later one 40 ms (25 fps) after.
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(40); 4]);
    assert_eq!(pts_of(&backend), vec![0, 3_600, 7_200, 10_800, 14_400]);
    assert_eq!(pusher.stream_time_base(), Some(Rational::MPEG_90K));
}

#[test]
fn test_late_packets_are_not_delayed() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut pusher, clock) = manual_pusher(&backend, LivePushConfig::default());

    pusher.init(4, 2, URL).unwrap();
    // Capture stalled for a second before the first frame arrived.
    clock.advance(Duration::from_secs(1));
    for _ in 0..5 {
        pusher.push_frame(&nv21(4, 2, 1)).unwrap();
    }
    assert!(clock.sleeps().is_empty());
    assert_eq!(pusher.frames_emitted(), 5);
}

#[test]
fn test_pacing_sleep_is_bounded() {
    let backend = Arc::new(MemoryBackend::new());
    let config = LivePushConfig::default()
        .with_frame_rate(Rational::new(1, 1))
        .with_max_pacing_sleep_ms(10);
    let (mut pusher, clock) = manual_pusher(&backend, config);

    pusher.init(4, 2, URL).unwrap();
    pusher.push_frame(&nv21(4, 2, 1)).unwrap();
    pusher.push_frame(&nv21(4, 2, 1)).unwrap();
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(10)]);
}

#[test]
fn test_stop_drains_buffered_frames_before_trailer() {
    let backend = Arc::new(MemoryBackend::new().with_encoder_delay(3));
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());

    pusher.init(4, 2, URL).unwrap();
    for i in 0..10 {
        pusher.push_frame(&nv21(4, 2, i)).unwrap();
    }
    assert_eq!(pusher.frames_emitted(), 7);

    pusher.stop().unwrap();
    assert_eq!(pusher.state(), PusherState::Closed);
    assert_eq!(pusher.frames_emitted(), 10);

    let events = backend.recording(URL).unwrap().events();
    let tail = &events[events.len() - 4..];
    assert_eq!(tail[3], SinkEvent::Trailer);
    let flushed: Vec<i64> = tail[..3]
        .iter()
        .map(|e| match e {
            SinkEvent::Packet { pts: Some(pts), .. } => *pts,
            other => panic!("expected packet, got {other:?}"),
        })
        .collect();
    assert!(flushed.windows(2).all(|w| w[0] < w[1]), "{flushed:?}");
    assert_eq!(flushed[0], 7 * 3_600);

    // Flushed payloads are the last three frames, in order.
    let packets = backend.recording(URL).unwrap().packets();
    assert_eq!(packets[9].data[0], 9);
}

#[test]
fn test_buffering_encoder_keeps_pusher_ready() {
    let backend = Arc::new(MemoryBackend::new().with_encoder_delay(2));
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());

    pusher.init(4, 2, URL).unwrap();
    assert_eq!(pusher.state(), PusherState::Ready);
    pusher.push_frame(&nv21(4, 2, 0)).unwrap();
    pusher.push_frame(&nv21(4, 2, 0)).unwrap();
    assert_eq!(pusher.state(), PusherState::Ready);
    assert_eq!(pusher.frames_emitted(), 0);

    pusher.push_frame(&nv21(4, 2, 0)).unwrap();
    assert_eq!(pusher.state(), PusherState::Streaming);
}

#[test]
fn test_operations_outside_their_states() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());

    let err = pusher.push_frame(&nv21(4, 2, 0)).unwrap_err();
    assert!(matches!(
        err,
        PushError::InvalidState {
            operation: "push_frame",
            state: "Uninitialized"
        }
    ));
    assert!(matches!(pusher.stop(), Err(PushError::InvalidState { .. })));

    pusher.init(4, 2, URL).unwrap();
    assert!(matches!(pusher.init(4, 2, URL), Err(PushError::InvalidState { .. })));

    pusher.stop().unwrap();
    let err = pusher.push_frame(&nv21(4, 2, 0)).unwrap_err();
    assert!(matches!(err, PushError::InvalidState { state: "Closed", .. }));
    assert!(matches!(pusher.stop(), Err(PushError::InvalidState { .. })));
}

#[test]
fn test_close_is_idempotent() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());

    pusher.init(4, 2, URL).unwrap();
    pusher.push_frame(&nv21(4, 2, 0)).unwrap();
    pusher.close();
    assert_eq!(pusher.state(), PusherState::Closed);
    pusher.close();
    drop(pusher);

    let log = backend.close_log();
    assert_eq!(log.count("encoder"), 1);
    assert_eq!(log.count(URL), 1);
    // close() abandons the stream without a trailer.
    assert!(!backend.recording(URL).unwrap().trailer_written());
}

#[test]
fn test_drop_releases_session() {
    let backend = Arc::new(MemoryBackend::new());
    {
        let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
        pusher.init(4, 2, URL).unwrap();
    }
    assert_eq!(backend.close_log().count("encoder"), 1);
    assert_eq!(backend.close_log().count(URL), 1);
}

#[test]
fn test_init_failures_leave_pusher_uninitialized() {
    let backend = Arc::new(MemoryBackend::new().fail_encoder_open());
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
    assert!(matches!(pusher.init(4, 2, URL), Err(PushError::EncoderOpenFailed(_))));
    assert_eq!(pusher.state(), PusherState::Uninitialized);

    let backend = Arc::new(MemoryBackend::new().refuse_sink(URL));
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
    assert!(matches!(pusher.init(4, 2, URL), Err(PushError::SinkOpenFailed { .. })));
    assert_eq!(pusher.state(), PusherState::Uninitialized);
    assert_eq!(backend.close_log().entries(), vec!["encoder"]);

    let backend = Arc::new(MemoryBackend::new().with_sink(MemorySink::new(URL).fail_header()));
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
    assert!(matches!(pusher.init(4, 2, URL), Err(PushError::HeaderWriteFailed(_))));
    assert_eq!(pusher.state(), PusherState::Uninitialized);
    assert_eq!(backend.close_log().count("encoder"), 1);
    assert_eq!(backend.close_log().count(URL), 1);
}

#[test]
fn test_wrong_frame_size_is_rejected() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
    pusher.init(4, 2, URL).unwrap();

    let err = pusher.push_frame(&[0u8; 5]).unwrap_err();
    assert!(matches!(err, PushError::FrameSizeMismatch { expected: 12, actual: 5 }));
    assert_eq!(pusher.state(), PusherState::Ready);
}

#[test]
fn test_cancel_drops_frame_and_allows_stop() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
    pusher.init(4, 2, URL).unwrap();
    pusher.push_frame(&nv21(4, 2, 0)).unwrap();

    pusher.cancel_flag().cancel();
    assert!(matches!(pusher.push_frame(&nv21(4, 2, 0)), Err(PushError::Cancelled)));
    assert_eq!(pusher.frames_emitted(), 1);

    pusher.stop().unwrap();
    assert!(backend.recording(URL).unwrap().trailer_written());
}

#[test]
fn test_write_failure_ends_session() {
    let backend = Arc::new(MemoryBackend::new().with_sink(MemorySink::new(URL).fail_packet_at(2)));
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
    pusher.init(4, 2, URL).unwrap();
    pusher.push_frame(&nv21(4, 2, 0)).unwrap();

    let err = pusher.push_frame(&nv21(4, 2, 0)).unwrap_err();
    assert!(matches!(err, PushError::MuxWriteFailed { packet_number: 2, .. }));
    assert_eq!(pusher.state(), PusherState::Closed);
    assert!(backend.recording(URL).unwrap().trailer_written());
    assert_eq!(backend.close_log().count("encoder"), 1);
    assert_eq!(backend.close_log().count(URL), 1);
}

#[test]
fn test_sink_chosen_time_base_is_used() {
    let backend = Arc::new(MemoryBackend::new().with_sink(MemorySink::new(URL).with_time_base(Rational::MILLISECONDS)));
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
    pusher.init(4, 2, URL).unwrap();
    for _ in 0..3 {
        pusher.push_frame(&nv21(4, 2, 0)).unwrap();
    }
    assert_eq!(pusher.stream_time_base(), Some(Rational::MILLISECONDS));
    assert_eq!(pts_of(&backend), vec![0, 40, 80]);

    let rec = backend.recording(URL).unwrap();
    assert_eq!(rec.container_hint().as_deref(), Some("flv"));
    assert_eq!(rec.streams()[0].requested_time_base, Rational::MPEG_90K);
}

#[test]
fn test_thirty_fps_into_millisecond_sink_keeps_real_time() {
    let backend = Arc::new(MemoryBackend::new().with_sink(MemorySink::new(URL).with_time_base(Rational::MILLISECONDS)));
    let config = LivePushConfig::default().with_frame_rate(Rational::new(30, 1));
    let (mut pusher, clock) = manual_pusher(&backend, config);

    pusher.init(4, 2, URL).unwrap();
    for _ in 0..31 {
        pusher.push_frame(&nv21(4, 2, 0)).unwrap();
    }

    let pts = pts_of(&backend);
    assert_eq!(&pts[..4], &[0, 33, 67, 100]);
    assert_eq!(pts[29], 967);
    assert_eq!(pts[30], 1_000);
    // The 30th packet is not released before 29/30 s.
    let slept_before_last = clock.total_slept() - *clock.sleeps().last().unwrap();
    assert!(slept_before_last >= Duration::from_nanos(966_666_667), "{slept_before_last:?}");
    assert_eq!(clock.total_slept(), Duration::from_secs(1));
}

#[test]
fn test_ntsc_rate_into_millisecond_sink_does_not_drift() {
    let backend = Arc::new(MemoryBackend::new().with_sink(MemorySink::new(URL).with_time_base(Rational::MILLISECONDS)));
    let config = LivePushConfig::default().with_frame_rate(Rational::new(30_000, 1_001));
    let (mut pusher, _clock) = manual_pusher(&backend, config);

    pusher.init(4, 2, URL).unwrap();
    for _ in 0..=300 {
        pusher.push_frame(&nv21(4, 2, 0)).unwrap();
    }

    let pts = pts_of(&backend);
    assert_eq!(pts[300], 10_010);
    assert!(pts.windows(2).all(|w| (33..=34).contains(&(w[1] - w[0]))));
    assert!(backend.recording(URL).unwrap().packets().iter().all(|p| p.duration == 33));
}

#[test]
fn test_cancel_during_pacing_sleep_drops_packet() {
    let backend = Arc::new(MemoryBackend::new().with_encoder_delay(1));
    let flag = CancelFlag::new();
    let clock = Arc::new(CancelDuringSleep {
        inner: ManualClock::new(),
        flag: flag.clone(),
    });
    let mut pusher = LivePusher::new(backend.clone(), LivePushConfig::default())
        .with_cancel_flag(flag)
        .with_clock(clock);
    pusher.init(4, 2, URL).unwrap();

    // Frame 0 is buffered, frame 1 releases it at pts 0 without waiting.
    pusher.push_frame(&nv21(4, 2, 0)).unwrap();
    pusher.push_frame(&nv21(4, 2, 1)).unwrap();
    assert_eq!(pusher.frames_emitted(), 1);

    // Frame 2 releases frame 1, which has to wait 40 ms; the flag goes up
    // while waiting.
    assert!(matches!(pusher.push_frame(&nv21(4, 2, 2)), Err(PushError::Cancelled)));
    assert_eq!(pusher.frames_emitted(), 1);
    assert_eq!(backend.recording(URL).unwrap().packets().len(), 1);

    pusher.stop().unwrap();
    assert_eq!(pusher.frames_emitted(), 2);
    let rec = backend.recording(URL).unwrap();
    let payloads: Vec<u8> = rec.packets().iter().map(|p| p.data[0]).collect();
    assert_eq!(payloads, vec![0, 2]);
    assert_eq!(pts_of(&backend), vec![0, 3_600]);
    assert_eq!(rec.events().last(), Some(&SinkEvent::Trailer));
}

#[test]
fn test_encoder_gets_session_geometry() {
    let backend = Arc::new(MemoryBackend::new());
    let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default().with_bitrate(800_000));
    pusher.init(640, 360, URL).unwrap();

    let params = &backend.opened_encoders()[0];
    assert_eq!((params.width, params.height), (640, 360));
    assert_eq!(params.time_base, Rational::new(1, 25));
    assert_eq!(params.bitrate_bps, 800_000);
    assert_eq!((params.qmin, params.qmax), (10, 51));
    assert_eq!(params.keyframe_interval_frames, 250);
}

#[test]
fn test_independent_sessions_on_separate_threads() {
    let handles: Vec<_> = (0..2)
        .map(|n| {
            std::thread::spawn(move || {
                let backend = Arc::new(MemoryBackend::new());
                let (mut pusher, _clock) = manual_pusher(&backend, LivePushConfig::default());
                pusher.init(4, 2, URL).unwrap();
                for _ in 0..(3 + n) {
                    pusher.push_frame(&nv21(4, 2, 0)).unwrap();
                }
                pusher.stop().unwrap();
                pusher.frames_emitted()
            })
        })
        .collect();
    let counts: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(counts, vec![3, 4]);
}
