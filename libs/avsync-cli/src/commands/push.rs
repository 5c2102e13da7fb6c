// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use anyhow::{Context, Result};
use avsync::{LivePushConfig, LivePusher, PushError, Rational};

pub fn run(input: &Path, url: &str, width: u32, height: u32, fps: Option<i32>, config: Option<&Path>) -> Result<()> {
    let mut config: LivePushConfig = super::load_config(config)?;
    if let Some(fps) = fps {
        config.frame_rate = Rational::new(fps, 1);
    }

    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let backend = super::backend()?;
    let mut pusher = LivePusher::new(backend, config);

    let cancel = pusher.cancel_flag();
    ctrlc::set_handler(move || cancel.cancel()).context("Failed to install Ctrl+C handler")?;

    pusher
        .init(width, height, url)
        .with_context(|| format!("Failed to start push to {url}"))?;
    let pushed = push_all(&mut pusher, BufReader::new(file), width, height)?;
    pusher.stop().context("Failed to finish push")?;

    println!("{url}: {pushed} frames in, {} packets out", pusher.frames_emitted());
    Ok(())
}

/// Feed every whole frame from `reader`. Returns the number of frames read.
/// A cancellation ends the loop without error; a trailing partial frame is
/// ignored.
pub fn push_all<R: Read>(pusher: &mut LivePusher, mut reader: R, width: u32, height: u32) -> Result<u64> {
    let frame_size = pusher.config().pixel_layout.frame_size(width, height);
    let mut buf = vec![0u8; frame_size];
    let mut frames = 0u64;

    loop {
        match reader.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("Failed to read raw frame"),
        }
        match pusher.push_frame(&buf) {
            Ok(()) => frames += 1,
            Err(PushError::Cancelled) => {
                tracing::info!(frames, "Push interrupted");
                break;
            }
            Err(e) => return Err(e).with_context(|| format!("Frame {frames} failed")),
        }
    }
    Ok(frames)
}
