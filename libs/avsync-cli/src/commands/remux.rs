// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;

use anyhow::{Context, Result};
use avsync::{CancelFlag, EndPolicy, RemuxConfig, Remuxer};

pub fn run(
    video: &str,
    audio: &str,
    output: &str,
    format: Option<String>,
    shortest: bool,
    config: Option<&Path>,
) -> Result<()> {
    let mut config: RemuxConfig = super::load_config(config)?;
    if let Some(format) = format {
        config.container_hint = Some(format);
    }
    if shortest {
        config.end_policy = EndPolicy::Shortest;
    }

    let backend = super::backend()?;
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.cancel()).context("Failed to install Ctrl+C handler")?;

    let report = Remuxer::new(config)
        .with_cancel_flag(cancel)
        .remux_locators(backend.as_ref(), video, audio, output)
        .with_context(|| format!("Remux into {output} failed"))?;

    println!(
        "{output}: {} video + {} audio packets",
        report.video_packets, report.audio_packets
    );
    if report.synthesized_video + report.synthesized_audio > 0 {
        println!(
            "  synthesized timestamps: {} video, {} audio",
            report.synthesized_video, report.synthesized_audio
        );
    }
    if report.dts_repaired > 0 {
        println!("  repaired DTS: {}", report.dts_repaired);
    }
    if report.close_failures > 0 {
        println!("  warning: {} resources failed to close cleanly", report.close_failures);
    }
    Ok(())
}
