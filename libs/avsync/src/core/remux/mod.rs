// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Remux synchronizer: one video-only and one audio-only source into a
//! single container, without decoding.
//!
//! Packets are pulled from whichever source is behind (compared exactly in
//! each source's own time base), given timestamps when their container has
//! none, rescaled into the output stream's time base and handed to the sink,
//! which interleaves them.

mod config;
mod cursor;
mod synchronizer;
mod synthetic;

pub use config::{EndPolicy, RemuxConfig};
pub use cursor::{InterleaveCursor, Side};
pub use synchronizer::{remux, remux_files, RemuxReport, Remuxer};
pub use synthetic::SyntheticTimestamps;
