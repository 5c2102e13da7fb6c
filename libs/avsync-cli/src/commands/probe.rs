// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use anyhow::{Context, Result};
use avsync::{MediaInfo, MediaKind};

pub fn run(input: &str, json: bool) -> Result<()> {
    let backend = super::backend()?;
    let info = avsync::probe(backend.as_ref(), input).with_context(|| format!("Failed to probe {input}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", summary(&info));
    }
    Ok(())
}

/// Human-readable listing.
fn summary(info: &MediaInfo) -> String {
    let mut out = format!("{}\n", info.locator);
    match info.duration_ms() {
        Some(ms) => out.push_str(&format!("  duration: {}.{:03}s\n", ms / 1000, ms % 1000)),
        None => out.push_str("  duration: unknown\n"),
    }
    for s in &info.streams {
        let detail = match s.kind {
            MediaKind::Video => {
                let rate = s.frame_rate.map(|r| format!(" @ {r}")).unwrap_or_default();
                format!("{}x{}{rate}", s.width, s.height)
            }
            MediaKind::Audio => format!("{} Hz, {} ch, {} b/s", s.sample_rate, s.channels, s.bit_rate),
            MediaKind::Other => String::new(),
        };
        out.push_str(&format!(
            "  #{} {} {} (tb {}) {detail}\n",
            s.index, s.kind, s.codec_name, s.time_base
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use avsync::core::memory::{MemoryBackend, MemorySource};
    use avsync::{Rational, StreamInfo};
    use std::time::Duration;

    #[test]
    fn test_summary_lists_streams() {
        let backend = MemoryBackend::new().with_source(
            MemorySource::new(
                "clip.mp4",
                vec![
                    StreamInfo::video(0, Rational::new(1, 15_360), "h264", 1280, 720)
                        .with_frame_rate(Rational::new(30, 1)),
                    StreamInfo::audio(1, Rational::new(1, 44_100), "aac", 44_100, 2).with_bit_rate(128_000),
                ],
            )
            .with_duration(Duration::from_millis(12_345)),
        );
        let info = avsync::probe(&backend, "clip.mp4").unwrap();
        let text = summary(&info);
        assert!(text.contains("duration: 12.345s"));
        assert!(text.contains("#0 video h264 (tb 1/15360) 1280x720 @ 30/1"));
        assert!(text.contains("#1 audio aac (tb 1/44100) 44100 Hz, 2 ch, 128000 b/s"));
    }
}
