// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Remux session configuration.

use serde::{Deserialize, Serialize};

use crate::core::time_base::Rational;

/// What to do when one source runs out before the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndPolicy {
    /// Keep copying the longer source until it is exhausted too.
    #[default]
    DrainRemaining,
    /// Stop at the first exhausted source.
    Shortest,
}

/// Configuration for a remux session.
///
/// Takes one video-only and one audio-only source and produces a single
/// container with one track of each.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemuxConfig {
    /// Container format name for the sink (`mp4`, `flv`, ...). `None` lets
    /// the sink guess from the output locator.
    pub container_hint: Option<String>,
    /// Frame rate used to invent timestamps for streams that declare none.
    pub fallback_frame_rate: Rational,
    pub end_policy: EndPolicy,
    /// Clamp a decode timestamp that lies after its presentation timestamp.
    pub repair_dts: bool,
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            container_hint: None,
            fallback_frame_rate: Rational::new(25, 1),
            end_policy: EndPolicy::default(),
            repair_dts: true,
        }
    }
}

impl RemuxConfig {
    /// Set the sink container format.
    pub fn with_container_hint(mut self, hint: impl Into<String>) -> Self {
        self.container_hint = Some(hint.into());
        self
    }

    /// Set the frame rate used for timestamp synthesis.
    pub fn with_fallback_frame_rate(mut self, frame_rate: Rational) -> Self {
        self.fallback_frame_rate = frame_rate;
        self
    }

    pub fn with_end_policy(mut self, policy: EndPolicy) -> Self {
        self.end_policy = policy;
        self
    }

    pub fn with_repair_dts(mut self, enabled: bool) -> Self {
        self.repair_dts = enabled;
        self
    }
}
