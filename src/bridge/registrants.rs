//! Extension points of the bridging pipeline.
//!
//! Every registrant is an async trait object so implementations may await
//! (call out to a service, consult a cache). Plain synchronous closures get a
//! blanket implementation, which covers the common case:
//!
//! ```ignore
//! bridge.register_filter(|event: &UiEvent| event.event_type != "thinking_start");
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;

use super::UiBridge;
use crate::schema::UiEvent;
use crate::types::Result;

/// Handle returned by registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub(crate) u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg-{}", self.0)
    }
}

/// Intercepts a host event before default translation.
///
/// `Ok(None)` means "no opinion": the next matching handler (and finally the
/// default translator) gets a turn.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        event_name: &str,
        payload: &Value,
        bridge: &UiBridge,
    ) -> Result<Option<UiEvent>>;
}

#[async_trait]
impl<F> EventHandler for F
where
    F: Fn(&str, &Value, &UiBridge) -> Option<UiEvent> + Send + Sync,
{
    async fn handle(
        &self,
        event_name: &str,
        payload: &Value,
        bridge: &UiBridge,
    ) -> Result<Option<UiEvent>> {
        Ok(self(event_name, payload, bridge))
    }
}

/// Predicate over a fully-formed primary event; `false` drops it.
#[async_trait]
pub trait EventFilter: Send + Sync {
    async fn keep(&self, event: &UiEvent) -> Result<bool>;
}

#[async_trait]
impl<F> EventFilter for F
where
    F: Fn(&UiEvent) -> bool + Send + Sync,
{
    async fn keep(&self, event: &UiEvent) -> Result<bool> {
        Ok(self(event))
    }
}

/// Maps a primary event to its emitted form.
///
/// Receives the event by reference so a failing transform leaves the prior
/// form intact.
#[async_trait]
pub trait EventTransform: Send + Sync {
    async fn apply(&self, event: &UiEvent) -> Result<UiEvent>;
}

#[async_trait]
impl<F> EventTransform for F
where
    F: Fn(UiEvent) -> UiEvent + Send + Sync,
{
    async fn apply(&self, event: &UiEvent) -> Result<UiEvent> {
        Ok(self(event.clone()))
    }
}

/// Produces extra events emitted after the primary one.
#[async_trait]
pub trait EventEnricher: Send + Sync {
    async fn enrich(
        &self,
        event_name: &str,
        payload: &Value,
        primary: &UiEvent,
    ) -> Result<Vec<UiEvent>>;
}

#[async_trait]
impl<F> EventEnricher for F
where
    F: Fn(&str, &Value, &UiEvent) -> Vec<UiEvent> + Send + Sync,
{
    async fn enrich(
        &self,
        event_name: &str,
        payload: &Value,
        primary: &UiEvent,
    ) -> Result<Vec<UiEvent>> {
        Ok(self(event_name, payload, primary))
    }
}

/// Async responder for one command type.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, data: Map<String, Value>) -> Result<Value>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn handle(&self, data: Map<String, Value>) -> Result<Value> {
        self(data).await
    }
}
