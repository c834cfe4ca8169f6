//! In-process queue transport.
//!
//! For UIs running in the same process as the host runtime. Events go into a
//! bounded buffer the UI drains; when the buffer is full new events are
//! dropped so the producer never waits on a slow UI. Commands travel the
//! other way through an unbounded buffer.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, Semaphore};

use super::{CommandInbox, UiAdapter};
use crate::schema::{UiCommand, UiEvent};
use crate::types::Result;

/// Default buffer size for the event queue.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

#[derive(Debug)]
pub struct QueueAdapter {
    name: String,
    events_tx: mpsc::Sender<UiEvent>,
    events_rx: Mutex<mpsc::Receiver<UiEvent>>,
    inbox: CommandInbox,
    dropped: AtomicU64,
}

impl QueueAdapter {
    /// Create a queue holding at most `max_queue_size` events (0 = unlimited).
    pub fn new(name: impl Into<String>, max_queue_size: usize) -> Self {
        let capacity = match max_queue_size {
            0 => Semaphore::MAX_PERMITS,
            n => n,
        };
        let (events_tx, events_rx) = mpsc::channel(capacity);
        Self {
            name: name.into(),
            events_tx,
            events_rx: Mutex::new(events_rx),
            inbox: CommandInbox::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Wait for the next event (UI side).
    pub async fn next_event(&self) -> Option<UiEvent> {
        self.events_rx.lock().await.recv().await
    }

    /// Take the next event if one is buffered (UI side).
    pub fn try_next_event(&self) -> Option<UiEvent> {
        self.events_rx.try_lock().ok()?.try_recv().ok()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events_tx.max_capacity() - self.events_tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events dropped because the buffer was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Send a command to the engine (UI side).
    pub fn send_command(&self, command: UiCommand) {
        self.inbox.push(command);
    }

    /// Discard buffered events; returns how many were dropped.
    ///
    /// A consumer parked in [`next_event`](Self::next_event) holds the
    /// receiver only while the buffer is empty, in which case this returns 0.
    pub fn clear_events(&self) -> usize {
        let Ok(mut rx) = self.events_rx.try_lock() else {
            return 0;
        };
        let mut cleared = 0;
        while rx.try_recv().is_ok() {
            cleared += 1;
        }
        cleared
    }

    /// Discard buffered commands; returns how many were dropped. See
    /// [`CommandInbox::drain`].
    pub fn clear_commands(&self) -> usize {
        self.inbox.drain()
    }

    pub fn is_connected(&self) -> bool {
        self.inbox.is_connected()
    }
}

#[async_trait]
impl UiAdapter for QueueAdapter {
    fn name(&self) -> &str {
        &self.name
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
        match self.events_tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(
                    adapter = %self.name,
                    event_type = %event.event_type,
                    dropped,
                    "Event queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(adapter = %self.name, "Event queue closed");
            }
        }
    }

    fn commands(&self) -> BoxStream<'static, UiCommand> {
        self.inbox.stream()
    }
}
