//! Inbound command buffer shared by the built-in adapters.
//!
//! The UI side pushes commands (unbounded, never blocks); the engine side
//! consumes them as a stream. The stream yields while the adapter is
//! connected, drains whatever is still buffered after a disconnect, then
//! ends.

use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Mutex};

use crate::schema::UiCommand;

/// How often a waiting consumer re-checks the connected flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct CommandInbox {
    tx: mpsc::UnboundedSender<UiCommand>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<UiCommand>>>,
    connected: Arc<AtomicBool>,
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Buffer a command for the engine.
    pub fn push(&self, command: UiCommand) {
        // The receiver lives as long as self, so this cannot fail
        let _ = self.tx.send(command);
    }

    /// A sender handle for background readers.
    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<UiCommand> {
        self.tx.clone()
    }

    /// Drop buffered commands not yet claimed by a consumer.
    ///
    /// Returns the number of commands discarded. A consumer holds the
    /// receiver only while it waits on an empty buffer, so when it is busy
    /// elsewhere (dispatching a command, say) the drain still runs; while it
    /// is parked waiting there is nothing to drop and this returns 0.
    pub fn drain(&self) -> usize {
        let Ok(mut rx) = self.rx.try_lock() else {
            return 0;
        };
        let mut drained = 0;
        while rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }

    /// Cancellable command stream; dropping it stops consumption.
    pub fn stream(&self) -> BoxStream<'static, UiCommand> {
        let state = (self.rx.clone(), self.connected.clone());
        futures::stream::unfold(state, |state| async move {
            let next = next_command(&state.0, &state.1).await;
            next.map(|command| (command, state))
        })
        .boxed()
    }
}

async fn next_command(
    rx: &Mutex<mpsc::UnboundedReceiver<UiCommand>>,
    connected: &AtomicBool,
) -> Option<UiCommand> {
    let mut rx = rx.lock().await;
    loop {
        match rx.try_recv() {
            Ok(command) => return Some(command),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => {}
        }
        if !connected.load(Ordering::SeqCst) {
            return None;
        }
        match tokio::time::timeout(POLL_INTERVAL, rx.recv()).await {
            Ok(Some(command)) => return Some(command),
            Ok(None) => return None,
            Err(_elapsed) => continue,
        }
    }
}
