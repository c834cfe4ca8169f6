//! In-memory adapter for tests.
//!
//! Captures every emitted event and every simulated command in order.
//!
//! ```ignore
//! let mock = Arc::new(MockAdapter::new());
//! bridge.attach_adapter(mock.clone()).await;
//! bridge.handle_host_event("tool:post", &json!({"tool_name": "bash"})).await;
//! mock.assert_event_emitted("tool_result", &json!({"tool_name": "bash"}));
//! ```

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

use super::{CommandInbox, UiAdapter};
use crate::schema::{UiCommand, UiEvent};
use crate::types::Result;

#[derive(Debug, Default)]
pub struct MockAdapter {
    events: Mutex<Vec<UiEvent>>,
    commands: Mutex<Vec<UiCommand>>,
    inbox: CommandInbox,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command as if a UI had sent it.
    pub fn simulate_command(&self, command: UiCommand) {
        lock(&self.commands).push(command.clone());
        self.inbox.push(command);
    }

    /// Captured events, oldest first.
    pub fn events(&self) -> Vec<UiEvent> {
        lock(&self.events).clone()
    }

    /// Simulated commands, oldest first.
    pub fn received_commands(&self) -> Vec<UiCommand> {
        lock(&self.commands).clone()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
        lock(&self.commands).clear();
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<UiEvent> {
        lock(&self.events)
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn last_event(&self) -> Option<UiEvent> {
        lock(&self.events).last().cloned()
    }

    pub fn last_event_of_type(&self, event_type: &str) -> Option<UiEvent> {
        lock(&self.events)
            .iter()
            .rev()
            .find(|e| e.event_type == event_type)
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.inbox.is_connected()
    }

    /// Find an event of `event_type` whose data contains every field of
    /// `expected` with an equal value.
    ///
    /// # Panics
    ///
    /// Panics with the captured event types when no event matches.
    #[track_caller]
    #[allow(clippy::panic)]
    pub fn assert_event_emitted(&self, event_type: &str, expected: &Value) -> UiEvent {
        let events = lock(&self.events);
        let found = events.iter().find(|event| {
            event.event_type == event_type
                && expected.as_object().map_or(true, |fields| {
                    fields.iter().all(|(k, v)| event.data.get(k) == Some(v))
                })
        });
        match found {
            Some(event) => event.clone(),
            None => {
                let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
                panic!(
                    "No event of type '{}' with data {} found. Events: {:?}",
                    event_type, expected, types
                );
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl UiAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<()> {
        self.inbox.set_connected(true);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.inbox.set_connected(false);
        Ok(())
    }

    async fn emit(&self, event: &UiEvent) {
        lock(&self.events).push(event.clone());
    }

    fn commands(&self) -> BoxStream<'static, UiCommand> {
        self.inbox.stream()
    }
}
