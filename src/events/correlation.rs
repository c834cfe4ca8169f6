//! Start/end correlation state.
//!
//! Start-class events (thinking block start, tool pre) record the id they were
//! issued; the matching end-class event pops it and uses it as its parent.
//! Entries are keyed by block index and tool name only, so two concurrent
//! invocations of the same tool share one slot and the later start wins.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Instant;

use crate::types::EventId;

/// An in-flight tool invocation.
#[derive(Debug, Clone)]
pub struct OpenTool {
    pub event_id: EventId,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl OpenTool {
    /// Milliseconds elapsed since the tool started.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Per-engine correlation maps. Never persisted.
#[derive(Debug, Default)]
pub struct CorrelationState {
    thinking: HashMap<Option<u64>, EventId>,
    tools: HashMap<String, OpenTool>,
}

impl CorrelationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_thinking(&mut self, block_index: Option<u64>, event_id: EventId) {
        self.thinking.insert(block_index, event_id);
    }

    pub fn close_thinking(&mut self, block_index: Option<u64>) -> Option<EventId> {
        self.thinking.remove(&block_index)
    }

    pub fn open_tool(&mut self, tool_name: &str, event_id: EventId) {
        self.tools.insert(
            tool_name.to_string(),
            OpenTool {
                event_id,
                started_at: Utc::now(),
                started: Instant::now(),
            },
        );
    }

    pub fn close_tool(&mut self, tool_name: &str) -> Option<OpenTool> {
        self.tools.remove(tool_name)
    }

    /// Number of open thinking blocks.
    pub fn open_thinking_count(&self) -> usize {
        self.thinking.len()
    }

    /// Number of in-flight tools.
    pub fn open_tool_count(&self) -> usize {
        self.tools.len()
    }
}
