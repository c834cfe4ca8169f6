//! Bridging engine - host events in, UI events out.
//!
//! One `UiBridge` per mounted session. It owns the active adapter, the
//! correlation state used by the default translator, the registrant lists
//! and the optional history ring buffer.
//!
//! Pipeline for [`UiBridge::handle_host_event`]:
//! ```text
//!   gate ─► handlers ─► default translator ─► filters ─► transforms
//!                                                          │
//!            enrichers ◄─ pending secondaries ◄─ emit ◄────┘
//! ```
//! Registrants are isolated from each other: an error or panic in one is
//! logged and that registrant is skipped. The only failure that reaches a
//! caller is an unknown command type in [`UiBridge::dispatch_command`].

pub mod recovery;
pub mod registrants;

use futures::{FutureExt, StreamExt};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::adapters::UiAdapter;
use crate::events::{translate_host_event, CorrelationState, EventKind, NamingScheme, PatternList, PatternSet};
use crate::schema::{UiCommand, UiEvent};
use crate::types::{BridgeConfig, Error, Result};

use recovery::{guard, panic_message, Stage};
pub use registrants::{
    CommandHandler, EventEnricher, EventFilter, EventHandler, EventTransform, RegistrationId,
};

type Registered<T> = (RegistrationId, Arc<T>);

/// The bridging engine.
pub struct UiBridge {
    config: BridgeConfig,
    scheme: NamingScheme,
    gate: PatternSet,

    adapter: RwLock<Option<Arc<dyn UiAdapter>>>,

    handlers: RwLock<PatternList<Registered<dyn EventHandler>>>,
    enrichers: RwLock<PatternList<Registered<dyn EventEnricher>>>,
    filters: RwLock<Vec<Registered<dyn EventFilter>>>,
    transforms: RwLock<Vec<Registered<dyn EventTransform>>>,
    command_handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,

    /// Only touched by the default translator; never held across an await.
    correlation: Mutex<CorrelationState>,
    history: Mutex<VecDeque<UiEvent>>,

    next_registration: AtomicU64,
}

impl UiBridge {
    /// Create an engine emitting with the first scheme of `config.event_mode`.
    pub fn new(config: BridgeConfig) -> Self {
        let scheme = config
            .event_mode
            .schemes()
            .first()
            .copied()
            .unwrap_or(NamingScheme::UiFriendly);
        Self::with_scheme(config, scheme)
    }

    /// Create an engine with an explicit naming scheme.
    pub fn with_scheme(config: BridgeConfig, scheme: NamingScheme) -> Self {
        let gate = PatternSet::new(config.events.iter().cloned());
        Self {
            config,
            scheme,
            gate,
            adapter: RwLock::new(None),
            handlers: RwLock::new(PatternList::default()),
            enrichers: RwLock::new(PatternList::default()),
            filters: RwLock::new(Vec::new()),
            transforms: RwLock::new(Vec::new()),
            command_handlers: RwLock::new(HashMap::new()),
            correlation: Mutex::new(CorrelationState::new()),
            history: Mutex::new(VecDeque::new()),
            next_registration: AtomicU64::new(1),
        }
    }

    /// Merge `options` over the defaults and build an engine from the result.
    pub fn configure(options: Value) -> Result<Self> {
        Ok(Self::new(BridgeConfig::configure(options)?))
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn scheme(&self) -> NamingScheme {
        self.scheme
    }

    // =========================================================================
    // Adapter
    // =========================================================================

    /// Replace the active adapter. Previously emitted events are not drained.
    pub async fn attach_adapter(&self, adapter: Arc<dyn UiAdapter>) {
        tracing::debug!(adapter = adapter.name(), "Adapter attached");
        *self.adapter.write().await = Some(adapter);
    }

    /// Detach and return the active adapter, if any.
    pub async fn detach_adapter(&self) -> Option<Arc<dyn UiAdapter>> {
        self.adapter.write().await.take()
    }

    pub async fn adapter(&self) -> Option<Arc<dyn UiAdapter>> {
        self.adapter.read().await.clone()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    fn next_id(&self) -> RegistrationId {
        RegistrationId(self.next_registration.fetch_add(1, Ordering::Relaxed))
    }

    pub async fn register_handler<H>(&self, pattern: &str, handler: H) -> RegistrationId
    where
        H: EventHandler + 'static,
    {
        self.register_handler_arc(pattern, Arc::new(handler)).await
    }

    pub async fn register_handler_arc(
        &self,
        pattern: &str,
        handler: Arc<dyn EventHandler>,
    ) -> RegistrationId {
        let id = self.next_id();
        self.handlers.write().await.push(pattern, (id, handler));
        id
    }

    /// Remove a handler registered under `pattern`. Returns whether it was found.
    pub async fn unregister_handler(&self, pattern: &str, id: RegistrationId) -> bool {
        self.handlers
            .write()
            .await
            .remove_where(pattern, |(entry, _)| *entry == id)
            > 0
    }

    pub async fn register_enricher<E>(&self, pattern: &str, enricher: E) -> RegistrationId
    where
        E: EventEnricher + 'static,
    {
        self.register_enricher_arc(pattern, Arc::new(enricher)).await
    }

    pub async fn register_enricher_arc(
        &self,
        pattern: &str,
        enricher: Arc<dyn EventEnricher>,
    ) -> RegistrationId {
        let id = self.next_id();
        self.enrichers.write().await.push(pattern, (id, enricher));
        id
    }

    pub async fn unregister_enricher(&self, pattern: &str, id: RegistrationId) -> bool {
        self.enrichers
            .write()
            .await
            .remove_where(pattern, |(entry, _)| *entry == id)
            > 0
    }

    pub async fn register_filter<F>(&self, filter: F) -> RegistrationId
    where
        F: EventFilter + 'static,
    {
        let id = self.next_id();
        self.filters.write().await.push((id, Arc::new(filter)));
        id
    }

    pub async fn register_transform<T>(&self, transform: T) -> RegistrationId
    where
        T: EventTransform + 'static,
    {
        let id = self.next_id();
        self.transforms.write().await.push((id, Arc::new(transform)));
        id
    }

    /// Associate `command_type` with a responder, replacing any previous one.
    pub async fn register_command_handler<C>(&self, command_type: &str, handler: C)
    where
        C: CommandHandler + 'static,
    {
        let previous = self
            .command_handlers
            .write()
            .await
            .insert(command_type.to_string(), Arc::new(handler));
        if previous.is_some() {
            tracing::debug!(command_type = %command_type, "Command handler replaced");
        }
    }

    // =========================================================================
    // Host events
    // =========================================================================

    /// Translate one host event and emit the result.
    ///
    /// Returns the primary event as emitted, or `None` when the event was
    /// gated out, untranslatable or filtered.
    pub async fn handle_host_event(&self, event_name: &str, payload: &Value) -> Option<UiEvent> {
        if !self.gate.matches(event_name) {
            return None;
        }

        // Snapshot so registrants may (un)register while we iterate
        let handlers = self.handlers.read().await.matching(event_name);

        let mut primary = None;
        for (_, handler) in handlers {
            let produced = guard(
                Stage::Handler,
                event_name,
                handler.handle(event_name, payload, self),
            )
            .await
            .flatten();
            if produced.is_some() {
                primary = produced;
                break;
            }
        }

        let mut pending = Vec::new();
        if primary.is_none() {
            let translation = {
                let mut state = self.correlation_state();
                translate_host_event(event_name, payload, &self.config, self.scheme, &mut state)
            };
            primary = translation.primary;
            pending = translation.pending;
        }

        let mut event = primary?;

        let filters = self.filters.read().await.clone();
        for (_, filter) in filters {
            // A failing filter counts as a pass
            if guard(Stage::Filter, event_name, filter.keep(&event)).await == Some(false) {
                tracing::trace!(event_name = %event_name, event_type = %event.event_type, "Event filtered");
                return None;
            }
        }

        let transforms = self.transforms.read().await.clone();
        for (_, transform) in transforms {
            if let Some(next) = guard(Stage::Transform, event_name, transform.apply(&event)).await {
                event = next;
            }
        }

        self.emit(event.clone()).await;

        for secondary in pending {
            self.emit(secondary).await;
        }

        let enrichers = self.enrichers.read().await.matching(event_name);
        for (_, enricher) in enrichers {
            let extra = guard(
                Stage::Enricher,
                event_name,
                enricher.enrich(event_name, payload, &event),
            )
            .await
            .unwrap_or_default();
            for extra_event in extra {
                self.emit(extra_event).await;
            }
        }

        Some(event)
    }

    /// Run the default translator directly, bypassing handlers and filters.
    ///
    /// Lets a handler decorate the default event. Secondary events the
    /// translator would queue (token usage after a thinking block) are
    /// discarded on this path.
    pub fn default_translate(&self, event_name: &str, payload: &Value) -> Option<UiEvent> {
        let mut state = self.correlation_state();
        translate_host_event(event_name, payload, &self.config, self.scheme, &mut state).primary
    }

    fn correlation_state(&self) -> MutexGuard<'_, CorrelationState> {
        self.correlation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Record `event` in history (when enabled) and hand it to the adapter.
    ///
    /// A no-op apart from history when no adapter is attached.
    pub async fn emit(&self, event: UiEvent) {
        if self.config.history.enabled {
            let mut history = self.history_buffer();
            history.push_back(event.clone());
            while history.len() > self.config.history.max_events {
                history.pop_front();
            }
        }

        let adapter = self.adapter.read().await.clone();
        if let Some(adapter) = adapter {
            adapter.emit(&event).await;
        }
    }

    /// Emit an application-defined event.
    pub async fn emit_custom(&self, event_type: &str, data: Value) -> UiEvent {
        let event = UiEvent::new(event_type, data);
        self.emit(event.clone()).await;
        event
    }

    /// Re-emit `events` in order.
    pub async fn replay(&self, events: Vec<UiEvent>) {
        for event in events {
            self.emit(event).await;
        }
    }

    /// Copy of the history ring buffer, oldest first.
    pub fn history(&self) -> Vec<UiEvent> {
        self.history_buffer().iter().cloned().collect()
    }

    fn history_buffer(&self) -> MutexGuard<'_, VecDeque<UiEvent>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Route a command to the handler registered for its type.
    pub async fn dispatch_command(&self, command: &UiCommand) -> Result<Value> {
        let handler = self
            .command_handlers
            .read()
            .await
            .get(&command.command_type)
            .cloned()
            .ok_or_else(|| Error::unknown_command(&command.command_type))?;

        match AssertUnwindSafe(handler.handle(command.data.clone()))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(Error::command(format!(
                "handler for {} panicked: {}",
                command.command_type,
                panic_message(payload.as_ref())
            ))),
        }
    }

    /// Consume the adapter's inbound commands until cancelled or the stream ends.
    ///
    /// Each command is dispatched and answered with a `command_result` or
    /// `command_error` event.
    pub async fn serve_commands(&self, cancel: CancellationToken) {
        let Some(adapter) = self.adapter().await else {
            tracing::warn!("serve_commands called without an adapter");
            return;
        };
        let mut commands = adapter.commands();
        tracing::debug!(adapter = adapter.name(), "Serving UI commands");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Command loop cancelled");
                    break;
                }
                next = commands.next() => {
                    let Some(command) = next else {
                        tracing::debug!("Command stream closed");
                        break;
                    };
                    self.answer_command(&command).await;
                }
            }
        }
    }

    async fn answer_command(&self, command: &UiCommand) {
        let event = match self.dispatch_command(command).await {
            Ok(result) => UiEvent::new(
                EventKind::CommandResult.name(self.scheme),
                json!({
                    "command_id": command.command_id,
                    "command_type": command.command_type,
                    "result": result,
                }),
            ),
            Err(err) => {
                tracing::warn!(
                    command_type = %command.command_type,
                    stage = %Stage::Command,
                    error = %err,
                    "Command failed"
                );
                UiEvent::new(
                    EventKind::CommandError.name(self.scheme),
                    json!({
                        "command_id": command.command_id,
                        "command_type": command.command_type,
                        "code": err.error_code(),
                        "message": err.to_string(),
                    }),
                )
            }
        };
        self.emit(event).await;
    }
}

impl fmt::Debug for UiBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiBridge")
            .field("scheme", &self.scheme)
            .field("events", &self.config.events)
            .field("history_enabled", &self.config.history.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::events::registry::ui;
    use crate::types::EventId;
    use serde_json::json;
    use tracing_test::traced_test;

    async fn bridge_with(options: Value) -> (UiBridge, Arc<MockAdapter>) {
        let bridge = UiBridge::configure(options).unwrap();
        let mock = Arc::new(MockAdapter::new());
        bridge.attach_adapter(mock.clone()).await;
        (bridge, mock)
    }

    #[tokio::test]
    async fn test_gate_blocks_unmatched_events() {
        let (bridge, mock) = bridge_with(json!({"events": ["tool:*"]})).await;
        let result = bridge
            .handle_host_event("session:start", &json!({"prompt": "hi"}))
            .await;
        assert!(result.is_none());
        assert!(mock.events().is_empty());
    }

    #[tokio::test]
    async fn test_handler_short_circuits_default() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge
            .register_handler("tool:*", |_: &str, payload: &Value, _: &UiBridge| {
                Some(UiEvent::new("custom_tool", payload.clone()))
            })
            .await;

        let event = bridge
            .handle_host_event("tool:pre", &json!({"tool_name": "bash"}))
            .await
            .unwrap();
        assert_eq!(event.event_type, "custom_tool");
        assert_eq!(mock.events().len(), 1);
    }

    #[tokio::test]
    async fn test_no_opinion_handler_falls_through() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge
            .register_handler("*", |_: &str, _: &Value, _: &UiBridge| None)
            .await;

        bridge
            .handle_host_event("tool:pre", &json!({"tool_name": "bash"}))
            .await;
        assert_eq!(mock.last_event().unwrap().event_type, ui::TOOL_START);
    }

    #[tokio::test]
    async fn test_handler_can_decorate_default_event() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge
            .register_handler("tool:post", |name: &str, payload: &Value, bridge: &UiBridge| {
                let mut payload = payload.clone();
                payload["badge"] = json!("fast");
                bridge.default_translate(name, &payload)
            })
            .await;

        bridge
            .handle_host_event("tool:post", &json!({"tool_name": "bash", "result": "ok"}))
            .await;
        mock.assert_event_emitted(ui::TOOL_RESULT, &json!({"badge": "fast", "output": "ok"}));
    }

    #[tokio::test]
    async fn test_unregister_handler() {
        let (bridge, mock) = bridge_with(json!({})).await;
        let id = bridge
            .register_handler("tool:pre", |_: &str, _: &Value, _: &UiBridge| {
                Some(UiEvent::new("intercepted", json!({})))
            })
            .await;

        assert!(!bridge.unregister_handler("tool:*", id).await);
        assert!(bridge.unregister_handler("tool:pre", id).await);

        bridge
            .handle_host_event("tool:pre", &json!({"tool_name": "bash"}))
            .await;
        assert_eq!(mock.last_event().unwrap().event_type, ui::TOOL_START);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failing_handler_is_skipped() {
        struct Broken;

        #[async_trait::async_trait]
        impl EventHandler for Broken {
            async fn handle(&self, _: &str, _: &Value, _: &UiBridge) -> Result<Option<UiEvent>> {
                Err(Error::registrant("handler exploded"))
            }
        }

        let (bridge, mock) = bridge_with(json!({})).await;
        bridge.register_handler("tool:pre", Broken).await;
        bridge
            .register_handler("tool:pre", |_: &str, _: &Value, _: &UiBridge| {
                Some(UiEvent::new("second", json!({})))
            })
            .await;

        let event = bridge
            .handle_host_event("tool:pre", &json!({"tool_name": "bash"}))
            .await
            .unwrap();
        assert_eq!(event.event_type, "second");
        assert_eq!(mock.events().len(), 1);
        assert!(logs_contain("handler exploded"));
    }

    #[tokio::test]
    async fn test_filter_drops_event() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge
            .register_filter(|event: &UiEvent| event.event_type != ui::TOOL_START)
            .await;

        let result = bridge
            .handle_host_event("tool:pre", &json!({"tool_name": "bash"}))
            .await;
        assert!(result.is_none());
        assert!(mock.events().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_panicking_filter_counts_as_pass() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge
            .register_filter(|_: &UiEvent| -> bool { panic!("filter panic") })
            .await;

        let result = bridge
            .handle_host_event("tool:pre", &json!({"tool_name": "bash"}))
            .await;
        assert!(result.is_some());
        assert_eq!(mock.events().len(), 1);
        assert!(logs_contain("registrant_panicked"));
    }

    #[tokio::test]
    async fn test_transforms_fold_in_order() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge
            .register_transform(|mut event: UiEvent| {
                event.data.insert("step".to_string(), json!("first"));
                event
            })
            .await;
        bridge
            .register_transform(|mut event: UiEvent| {
                let prior = event.data.get("step").cloned().unwrap_or_default();
                event.data.insert("prior".to_string(), prior);
                event.data.insert("step".to_string(), json!("second"));
                event
            })
            .await;

        let event = bridge
            .handle_host_event("session:start", &json!({"prompt": "hi"}))
            .await
            .unwrap();
        assert_eq!(event.data["step"], "second");
        assert_eq!(event.data["prior"], "first");
        assert_eq!(mock.last_event().unwrap(), event);
    }

    #[tokio::test]
    async fn test_failing_transform_keeps_prior_form() {
        struct Broken;

        #[async_trait::async_trait]
        impl EventTransform for Broken {
            async fn apply(&self, _: &UiEvent) -> Result<UiEvent> {
                Err(Error::registrant("nope"))
            }
        }

        let (bridge, _mock) = bridge_with(json!({})).await;
        bridge
            .register_transform(|mut event: UiEvent| {
                event.data.insert("tagged".to_string(), json!(true));
                event
            })
            .await;
        bridge.register_transform(Broken).await;

        let event = bridge
            .handle_host_event("session:start", &json!({"prompt": "hi"}))
            .await
            .unwrap();
        assert_eq!(event.data["tagged"], true);
    }

    #[tokio::test]
    async fn test_emission_order_primary_pending_enricher() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge
            .register_enricher("content_block:*", |_: &str, _: &Value, primary: &UiEvent| {
                vec![UiEvent::new("notification", json!({"after": primary.event_type}))]
            })
            .await;

        bridge
            .handle_host_event(
                "content_block:start",
                &json!({"block_type": "thinking", "block_index": 0}),
            )
            .await;
        mock.clear();

        bridge
            .handle_host_event(
                "content_block:end",
                &json!({
                    "block_index": 0,
                    "block": {"type": "thinking", "thinking": "t"},
                    "usage": {"input_tokens": 1, "output_tokens": 2},
                }),
            )
            .await;

        let types: Vec<String> = mock.events().into_iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![ui::THINKING_END, ui::TOKEN_USAGE, "notification"]);
    }

    #[tokio::test]
    async fn test_enricher_does_not_run_when_filtered() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge.register_filter(|_: &UiEvent| false).await;
        bridge
            .register_enricher("*", |_: &str, _: &Value, _: &UiEvent| {
                vec![UiEvent::new("extra", json!({}))]
            })
            .await;

        bridge
            .handle_host_event("session:start", &json!({"prompt": "hi"}))
            .await;
        assert!(mock.events().is_empty());
    }

    #[tokio::test]
    async fn test_history_bound() {
        let (bridge, _mock) =
            bridge_with(json!({"history": {"enabled": true, "max_events": 5}})).await;

        let mut last = None;
        for i in 0..10 {
            last = bridge
                .handle_host_event("tool:pre", &json!({"tool_name": format!("tool-{i}")}))
                .await;
        }

        let history = bridge.history();
        assert_eq!(history.len(), 5);
        assert_eq!(history.last().map(|e| e.event_id.clone()), last.map(|e| e.event_id));
        assert_eq!(history[0].data["tool_name"], "tool-5");
    }

    #[tokio::test]
    async fn test_history_disabled_by_default() {
        let (bridge, _mock) = bridge_with(json!({})).await;
        bridge
            .handle_host_event("session:start", &json!({"prompt": "hi"}))
            .await;
        assert!(bridge.history().is_empty());
    }

    #[tokio::test]
    async fn test_emit_without_adapter_is_noop() {
        let bridge = UiBridge::configure(json!({"history": {"enabled": true}})).unwrap();
        bridge.emit_custom("notification", json!({"msg": "hi"})).await;
        assert_eq!(bridge.history().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_reemits_in_order() {
        let (bridge, mock) = bridge_with(json!({})).await;
        let events = vec![
            UiEvent::new("a", json!({})).with_event_id(EventId::from("1")),
            UiEvent::new("b", json!({})).with_event_id(EventId::from("2")),
        ];
        bridge.replay(events.clone()).await;
        assert_eq!(mock.events(), events);
    }

    #[tokio::test]
    async fn test_dispatch_command() {
        let (bridge, _mock) = bridge_with(json!({})).await;
        bridge
            .register_command_handler("submit_prompt", |data: serde_json::Map<String, Value>| async move {
                Ok::<_, Error>(json!({"echo": data.get("prompt").cloned()}))
            })
            .await;

        let result = bridge
            .dispatch_command(&UiCommand::new("submit_prompt", json!({"prompt": "hello"})))
            .await
            .unwrap();
        assert_eq!(result, json!({"echo": "hello"}));

        let err = bridge
            .dispatch_command(&UiCommand::new("frobnicate", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCommand(ref t) if t == "frobnicate"));
    }

    #[tokio::test]
    async fn test_serve_commands_answers_and_reports_errors() {
        let (bridge, mock) = bridge_with(json!({})).await;
        bridge
            .register_command_handler("cancel_generation", |_: serde_json::Map<String, Value>| async {
                Ok::<_, Error>(json!("cancelled"))
            })
            .await;

        let ok = UiCommand::new("cancel_generation", json!({}));
        let unknown = UiCommand::new("frobnicate", json!({}));
        mock.connect().await.unwrap();
        mock.simulate_command(ok.clone());
        mock.simulate_command(unknown.clone());
        // Buffered commands are still drained after disconnect
        mock.disconnect().await.unwrap();

        bridge.serve_commands(CancellationToken::new()).await;

        mock.assert_event_emitted(
            ui::COMMAND_RESULT,
            &json!({"command_id": ok.command_id.as_str(), "result": "cancelled"}),
        );
        mock.assert_event_emitted(
            ui::COMMAND_ERROR,
            &json!({"command_id": unknown.command_id.as_str(), "code": "UNKNOWN_COMMAND"}),
        );
    }

    #[tokio::test]
    async fn test_serve_commands_stops_on_cancel() {
        let (bridge, _mock) = bridge_with(json!({})).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            bridge.serve_commands(cancel),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_native_scheme_names() {
        let bridge =
            UiBridge::with_scheme(BridgeConfig::default(), NamingScheme::Native);
        let event = bridge
            .handle_host_event("tool:pre", &json!({"tool_name": "bash"}))
            .await
            .unwrap();
        assert_eq!(event.event_type, "tool:pre");
    }
}
