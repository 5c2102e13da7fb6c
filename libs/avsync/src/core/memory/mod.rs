// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! In-memory collaborators.
//!
//! Scripted sources, a recording sink and a delaying encoder, with failure
//! injection at every step a real backend can fail. Sessions cannot tell them
//! from the FFmpeg backend.

mod backend;
mod close_log;
mod encoder;
mod sink;
mod source;

pub use backend::MemoryBackend;
pub use close_log::CloseLog;
pub use encoder::ScriptedEncoder;
pub use sink::{MemorySink, RecordedStream, SinkEvent, SinkRecording};
pub use source::MemorySource;
