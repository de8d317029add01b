// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Host-facing log sink
//!
//! Failures in the world API never panic or propagate; they surface as one
//! human-readable line on a [`LogSink`]. The default sink forwards to
//! `tracing`, so a host that installs a subscriber sees them alongside the
//! crate's own structured events.

use std::cell::RefCell;
use std::rc::Rc;

/// Receives the world's user-visible messages
pub trait LogSink {
    /// Record one message
    fn log(&self, message: &str);
}

/// Forwards messages to `tracing` at INFO level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        tracing::info!(target: "physics_sync::world", "{}", message);
    }
}

/// Keeps every message in memory
///
/// Clones share the same buffer, so a test can hand one clone to the world
/// and inspect the other.
///
/// ```
/// use physics_sync::log::{LogSink, RecordingSink};
///
/// let sink = RecordingSink::new();
/// let handle = sink.clone();
/// sink.log("hello");
/// assert_eq!(handle.messages(), vec!["hello".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Rc<RefCell<Vec<String>>>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every message logged so far
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    /// Whether any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.borrow().iter().any(|m| m.contains(needle))
    }

    /// Drop all recorded messages
    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl LogSink for RecordingSink {
    fn log(&self, message: &str) {
        tracing::debug!(target: "physics_sync::world", "{}", message);
        self.messages.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_shares_buffer() {
        let sink = RecordingSink::new();
        let other = sink.clone();
        sink.log("Added constraint to world.");
        other.log("second");

        assert_eq!(sink.messages().len(), 2);
        assert!(other.contains("constraint"));

        other.clear();
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_tracing_sink_without_subscriber() {
        TracingSink.log("no subscriber installed");
    }
}
