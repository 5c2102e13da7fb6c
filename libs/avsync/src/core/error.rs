// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

use super::stream::MediaKind;

/// Failure reported by a collaborator (source, sink, encoder, backend).
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to open '{locator}': {reason}")]
    Open { locator: String, reason: String },

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Resource already closed: {0}")]
    Closed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MediaError>;

/// Terminal failure of a remux session. None of these are retried.
#[derive(Error, Debug)]
pub enum RemuxError {
    #[error("Could not open source '{locator}'")]
    SourceOpenFailed {
        locator: String,
        #[source]
        source: MediaError,
    },

    #[error("Could not create sink '{locator}'")]
    SinkOpenFailed {
        locator: String,
        #[source]
        source: MediaError,
    },

    #[error("No {kind} stream found in {origin}")]
    NoStreamFound { kind: MediaKind, origin: String },

    #[error("Could not add output stream for {kind}")]
    StreamSetupFailed {
        kind: MediaKind,
        #[source]
        source: MediaError,
    },

    #[error("Failed to write container header")]
    HeaderWriteFailed(#[source] MediaError),

    #[error("Failed to read {kind} packet")]
    ReadFailed {
        kind: MediaKind,
        #[source]
        source: MediaError,
    },

    #[error("Failed to write {kind} packet #{packet_number}")]
    MuxWriteFailed {
        kind: MediaKind,
        packet_number: u64,
        #[source]
        source: MediaError,
    },

    #[error("Failed to write container trailer after {packets_written} packets")]
    TrailerWriteFailed {
        packets_written: u64,
        #[source]
        source: MediaError,
    },

    #[error("Remux cancelled after {packets_written} packets")]
    Cancelled { packets_written: u64 },
}

/// Failure of a live push session.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("Could not open encoder")]
    EncoderOpenFailed(#[source] MediaError),

    #[error("Could not open sink '{locator}'")]
    SinkOpenFailed {
        locator: String,
        #[source]
        source: MediaError,
    },

    #[error("Could not add output stream")]
    StreamSetupFailed(#[source] MediaError),

    #[error("Failed to write container header")]
    HeaderWriteFailed(#[source] MediaError),

    #[error("`{operation}` is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invalid push configuration: {0}")]
    Configuration(String),

    #[error("Raw frame is {actual} bytes, expected {expected}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    #[error("Encoder failed")]
    EncodeFailed(#[source] MediaError),

    #[error("Failed to write packet #{packet_number}")]
    MuxWriteFailed {
        packet_number: u64,
        #[source]
        source: MediaError,
    },

    #[error("Failed to write container trailer")]
    TrailerWriteFailed(#[source] MediaError),

    #[error("Live push cancelled")]
    Cancelled,
}
