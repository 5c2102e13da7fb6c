// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use parking_lot::Mutex;

/// Shared record of `close()` calls, in call order.
#[derive(Debug, Clone, Default)]
pub struct CloseLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CloseLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: &str) {
        self.entries.lock().push(label.to_string());
    }

    /// How many times `label` was closed.
    pub fn count(&self, label: &str) -> usize {
        self.entries.lock().iter().filter(|e| e.as_str() == label).count()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
