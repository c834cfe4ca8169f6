//! Transport adapters - where UI events go and where UI commands come from.
//!
//! Every transport implements [`UiAdapter`]. Delivery is best-effort:
//! `emit` never returns an error, failures are logged and swallowed at the
//! adapter boundary so a broken UI can never stall the host runtime.
//!
//! Built-in transports:
//! - [`QueueAdapter`]: bounded in-process buffer
//! - [`LineStreamAdapter`]: JSON lines over a byte stream (sidecar stdio)
//! - [`BroadcastAdapter`]: fan-out to connected peers (WebSocket server)
//! - [`MockAdapter`]: in-memory capture for tests

pub mod broadcast;
pub mod codec;
pub mod inbox;
pub mod line_stream;
pub mod mock;
pub mod queue;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::schema::{UiCommand, UiEvent};
use crate::types::Result;

pub use broadcast::{BroadcastAdapter, PeerId};
pub use inbox::CommandInbox;
pub use line_stream::LineStreamAdapter;
pub use mock::MockAdapter;
pub use queue::QueueAdapter;

/// Transport contract between the engine and a UI.
#[async_trait]
pub trait UiAdapter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Set up the transport. Idempotent.
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Tear down the transport. Idempotent.
    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    /// Deliver one event, best-effort.
    async fn emit(&self, event: &UiEvent);

    /// Deliver several events. Sequential `emit` unless overridden.
    async fn emit_batch(&self, events: &[UiEvent]) {
        for event in events {
            self.emit(event).await;
        }
    }

    /// Inbound commands. Dropping the stream cancels consumption.
    fn commands(&self) -> BoxStream<'static, UiCommand>;
}
