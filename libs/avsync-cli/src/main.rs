// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! avsync CLI
//!
//! Remux separate audio and video files, probe media, and push raw camera
//! frames to a live endpoint.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "avsync")]
#[command(author, version, about = "Audio/video remux and live push", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a video-only and an audio-only file into one container
    Remux {
        /// Video source (file or URL)
        #[arg(long, value_name = "IN")]
        video: String,

        /// Audio source (file or URL)
        #[arg(long, value_name = "IN")]
        audio: String,

        /// Output file or URL
        #[arg(short, long, value_name = "OUT")]
        output: String,

        /// Container format (guessed from the output name if omitted)
        #[arg(long = "format", value_name = "NAME")]
        format: Option<String>,

        /// Stop when the shorter input ends
        #[arg(long)]
        shortest: bool,

        /// Remux settings file (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show streams and duration of a media file
    Probe {
        #[arg(value_name = "IN")]
        input: String,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Encode raw frames from a file and push them in real time
    Push {
        /// Raw frame file (back-to-back frames in the configured pixel layout)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Destination URL (rtmp://..., file path)
        #[arg(long)]
        url: String,

        #[arg(long)]
        width: u32,

        #[arg(long)]
        height: u32,

        /// Frames per second (overrides the config file)
        #[arg(long)]
        fps: Option<i32>,

        /// Push settings file (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Remux {
            video,
            audio,
            output,
            format,
            shortest,
            config,
        }) => {
            commands::remux::run(&video, &audio, &output, format, shortest, config.as_deref())?;
        }
        Some(Commands::Probe { input, json }) => {
            commands::probe::run(&input, json)?;
        }
        Some(Commands::Push {
            input,
            url,
            width,
            height,
            fps,
            config,
        }) => {
            commands::push::run(&input, &url, width, height, fps, config.as_deref())?;
        }
        None => {
            // No subcommand: show help
            Cli::parse_from(["avsync", "--help"]);
        }
    }

    Ok(())
}
