// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use avsync::core::memory::{MemoryBackend, MemorySource};
use avsync::{probe, MediaError, MediaKind, Rational, StreamInfo};

const CLIP: &str = "mem://clip.mp4";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("avsync=debug")
        .try_init();
}

fn clip() -> MemorySource {
    MemorySource::new(
        CLIP,
        vec![
            StreamInfo::audio(0, Rational::new(1, 48_000), "aac", 48_000, 2)
                .with_bit_rate(128_000)
                .with_duration(48_000 * 3),
            StreamInfo::video(1, Rational::MPEG_90K, "h264", 1920, 1080)
                .with_frame_rate(Rational::new(30, 1))
                .with_rotation(90.0)
                .with_duration(90_000 * 2),
        ],
    )
}

#[test]
fn test_probe_reports_first_streams_of_each_kind() {
    init_tracing();
    let backend = MemoryBackend::new().with_source(clip().with_duration(Duration::from_millis(3_021)));

    let info = probe(&backend, CLIP).unwrap();
    assert_eq!(info.locator, CLIP);
    assert_eq!(info.duration_ms(), Some(3_021));
    assert_eq!(info.video_size(), Some((1920, 1080)));
    assert_eq!(info.video_codec_name(), Some("h264"));
    assert_eq!(info.rotation_degrees(), Some(90.0));
    assert_eq!(info.audio_bitrate(), Some(128_000));
    assert_eq!(info.streams[1].kind, MediaKind::Video);
    assert_eq!(info.streams[1].duration_ms, Some(2_000));

    assert_eq!(backend.close_log().entries(), vec![CLIP]);
}

#[test]
fn test_duration_falls_back_to_longest_stream() {
    let backend = MemoryBackend::new().with_source(clip());
    let info = probe(&backend, CLIP).unwrap();
    assert_eq!(info.duration_ms(), Some(3_000));
}

#[test]
fn test_audio_only_container() {
    let backend = MemoryBackend::new().with_source(MemorySource::new(
        "mem://voice.m4a",
        vec![StreamInfo::audio(0, Rational::new(1, 16_000), "aac", 16_000, 1)],
    ));
    let info = probe(&backend, "mem://voice.m4a").unwrap();
    assert_eq!(info.video_size(), None);
    assert_eq!(info.rotation_degrees(), None);
    assert_eq!(info.audio_bitrate(), Some(0));
    assert_eq!(info.duration_ms(), None);
}

#[test]
fn test_unrotated_video_reports_zero() {
    let backend = MemoryBackend::new().with_source(MemorySource::new(
        CLIP,
        vec![StreamInfo::video(0, Rational::new(1, 25), "hevc", 640, 360)],
    ));
    let info = probe(&backend, CLIP).unwrap();
    assert_eq!(info.rotation_degrees(), Some(0.0));
}

#[test]
fn test_missing_source() {
    let backend = MemoryBackend::new();
    let err = probe(&backend, "mem://nothing").unwrap_err();
    assert!(matches!(err, MediaError::Open { .. }));
}

#[test]
fn test_media_info_serializes_without_empty_fields() {
    let backend = MemoryBackend::new().with_source(MemorySource::new(
        CLIP,
        vec![StreamInfo::video(0, Rational::new(1, 25), "h264", 640, 360)],
    ));
    let info = probe(&backend, CLIP).unwrap();
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["locator"], CLIP);
    assert!(json.get("duration_ms").is_none());
    assert!(json["streams"][0].get("rotation_degrees").is_none());
    assert_eq!(json["streams"][0]["width"], 640);
}
