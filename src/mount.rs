//! Mount layer - wires engines into a host runtime's hook facility.
//!
//! The host calls registered callbacks with `(event_name, payload)`. Mounting
//! builds the transport named by the configuration, connects it, creates one
//! engine per naming scheme of the event mode and subscribes them to the
//! host events the bridge understands. The bridge never halts the host.
//!
//! Everything an embedding application wants to inject (pre-built adapters,
//! custom transport factories, handlers registered ahead of time) travels in
//! an explicit [`BridgeContext`].

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::adapters::{BroadcastAdapter, LineStreamAdapter, QueueAdapter, UiAdapter};
use crate::bridge::{EventEnricher, EventHandler, UiBridge};
use crate::events::registry::MOUNTED_HOST_EVENTS;
use crate::schema::UiEvent;
use crate::types::{BridgeConfig, Error, Result, TransportConfig};

/// Directive returned to the host after a hook callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Continue,
    Halt,
}

/// Async hook callback: `(event_name, payload) -> action`.
pub type HookCallback = Arc<dyn Fn(String, Value) -> BoxFuture<'static, HookAction> + Send + Sync>;

/// Hook registration facility offered by a host runtime.
pub trait HostHooks: Send + Sync {
    fn register(&self, event_name: &str, callback: HookCallback);
}

/// In-process hook facility: callbacks keyed by exact event name.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<HookCallback>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback registered for `event_name`, in registration order.
    ///
    /// Stops at the first callback that returns [`HookAction::Halt`].
    pub async fn fire(&self, event_name: &str, payload: Value) -> HookAction {
        let callbacks = self
            .hooks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(event_name)
            .cloned()
            .unwrap_or_default();

        for callback in callbacks {
            if callback(event_name.to_string(), payload.clone()).await == HookAction::Halt {
                return HookAction::Halt;
            }
        }
        HookAction::Continue
    }

    /// Event names with at least one callback, sorted.
    pub fn registered_events(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .hooks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl HostHooks for HookRegistry {
    fn register(&self, event_name: &str, callback: HookCallback) {
        self.hooks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(event_name.to_string())
            .or_default()
            .push(callback);
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("events", &self.registered_events())
            .finish()
    }
}

/// Builds a custom transport from its `adapter_config` mapping.
pub type AdapterFactory =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Arc<dyn UiAdapter>> + Send + Sync>;

/// Registrations supplied by the embedding application before mounting.
#[derive(Default)]
pub struct BridgeContext {
    adapters: HashMap<String, Arc<dyn UiAdapter>>,
    factories: HashMap<String, AdapterFactory>,
    handlers: Vec<(String, Arc<dyn EventHandler>)>,
    enrichers: Vec<(String, Arc<dyn EventEnricher>)>,
}

impl BridgeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `adapter` available under `name` (queue transports look up by
    /// `queue_name`).
    pub fn set_adapter(&mut self, name: &str, adapter: Arc<dyn UiAdapter>) {
        self.adapters.insert(name.to_string(), adapter);
    }

    pub fn adapter(&self, name: &str) -> Option<Arc<dyn UiAdapter>> {
        self.adapters.get(name).cloned()
    }

    /// Create a queue adapter the UI can hold on to, registered under `name`.
    pub fn create_queue_adapter(&mut self, name: &str, max_queue_size: usize) -> Arc<QueueAdapter> {
        let queue = Arc::new(QueueAdapter::new(name, max_queue_size));
        self.set_adapter(name, queue.clone());
        queue
    }

    /// Register a factory for `transport.type = "custom"` with `adapter = name`.
    pub fn register_adapter_factory<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Map<String, Value>) -> Result<Arc<dyn UiAdapter>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    /// Handler added to every engine created by [`mount`].
    pub fn register_handler<H>(&mut self, pattern: &str, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.push((pattern.to_string(), Arc::new(handler)));
    }

    /// Enricher added to every engine created by [`mount`].
    pub fn register_enricher<E>(&mut self, pattern: &str, enricher: E)
    where
        E: EventEnricher + 'static,
    {
        self.enrichers.push((pattern.to_string(), Arc::new(enricher)));
    }

    fn build_adapter(&mut self, transport: &TransportConfig) -> Result<Arc<dyn UiAdapter>> {
        let (name, adapter): (String, Arc<dyn UiAdapter>) = match transport {
            TransportConfig::Queue {
                queue_name,
                max_queue_size,
            } => {
                if let Some(existing) = self.adapter(queue_name) {
                    return Ok(existing);
                }
                (
                    queue_name.clone(),
                    Arc::new(QueueAdapter::new(queue_name.as_str(), *max_queue_size)),
                )
            }
            TransportConfig::LineStream {} => {
                ("line_stream".to_string(), Arc::new(LineStreamAdapter::stdio()))
            }
            TransportConfig::Websocket { host, port } => (
                "websocket".to_string(),
                Arc::new(BroadcastAdapter::new(host.as_str(), *port)),
            ),
            TransportConfig::Custom {
                adapter,
                adapter_config,
            } => {
                let factory = self.factories.get(adapter).ok_or_else(|| {
                    Error::config(format!("no adapter factory registered as '{}'", adapter))
                })?;
                ("custom".to_string(), factory(adapter_config)?)
            }
        };
        self.set_adapter(&name, adapter.clone());
        Ok(adapter)
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adapters: Vec<&String> = self.adapters.keys().collect();
        adapters.sort();
        let mut factories: Vec<&String> = self.factories.keys().collect();
        factories.sort();
        f.debug_struct("BridgeContext")
            .field("adapters", &adapters)
            .field("factories", &factories)
            .field("handlers", &self.handlers.len())
            .field("enrichers", &self.enrichers.len())
            .finish()
    }
}

/// Engines mounted into a host, plus the shared transport.
pub struct MountedBridge {
    bridges: Vec<Arc<UiBridge>>,
    adapter: Option<Arc<dyn UiAdapter>>,
    transport: &'static str,
}

impl MountedBridge {
    /// One engine per naming scheme, in `EventMode::schemes` order.
    pub fn bridges(&self) -> &[Arc<UiBridge>] {
        &self.bridges
    }

    pub fn adapter(&self) -> Option<Arc<dyn UiAdapter>> {
        self.adapter.clone()
    }

    pub fn transport(&self) -> &'static str {
        self.transport
    }

    /// Emit an application-defined event once through the shared transport.
    pub async fn emit_custom(&self, event_type: &str, data: Value) -> Option<UiEvent> {
        let bridge = self.bridges.first()?;
        Some(bridge.emit_custom(event_type, data).await)
    }

    /// Disconnect the transport. Host hooks stay registered but become
    /// no-ops for delivery.
    pub async fn unmount(&self) {
        for bridge in &self.bridges {
            bridge.detach_adapter().await;
        }
        if let Some(adapter) = &self.adapter {
            if let Err(err) = adapter.disconnect().await {
                tracing::warn!(adapter = adapter.name(), error = %err, "Adapter disconnect failed");
            }
        }
        tracing::info!(transport = self.transport, "Unmounted UI bridge");
    }
}

impl fmt::Debug for MountedBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedBridge")
            .field("bridges", &self.bridges)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Parse `options` over the defaults, then [`mount`].
pub async fn mount_with_options(
    hooks: &dyn HostHooks,
    options: Value,
    context: &mut BridgeContext,
) -> Result<MountedBridge> {
    let config = BridgeConfig::configure(options)?;
    Ok(mount(hooks, config, context).await)
}

/// Build the transport and engines and subscribe them to host events.
///
/// Transport failures are logged; the engines are mounted regardless and
/// simply deliver nowhere.
pub async fn mount(
    hooks: &dyn HostHooks,
    config: BridgeConfig,
    context: &mut BridgeContext,
) -> MountedBridge {
    let transport = config.transport.kind();

    let adapter = match context.build_adapter(&config.transport) {
        Ok(adapter) => Some(adapter),
        Err(err) => {
            tracing::error!(transport, error = %err, "Failed to build UI adapter");
            None
        }
    };
    if let Some(adapter) = &adapter {
        if let Err(err) = adapter.connect().await {
            tracing::error!(adapter = adapter.name(), error = %err, "Adapter connect failed");
        }
    }

    let mut bridges = Vec::new();
    for scheme in config.event_mode.schemes() {
        let bridge = Arc::new(UiBridge::with_scheme(config.clone(), *scheme));
        for (pattern, handler) in &context.handlers {
            bridge.register_handler_arc(pattern, handler.clone()).await;
        }
        for (pattern, enricher) in &context.enrichers {
            bridge.register_enricher_arc(pattern, enricher.clone()).await;
        }
        if let Some(adapter) = &adapter {
            bridge.attach_adapter(adapter.clone()).await;
        }
        bridges.push(bridge);
    }

    let shared = Arc::new(bridges.clone());
    for event_name in MOUNTED_HOST_EVENTS.iter().copied() {
        let shared = shared.clone();
        let callback: HookCallback = Arc::new(move |_name: String, payload: Value| {
            let shared = shared.clone();
            async move {
                for bridge in shared.iter() {
                    bridge.handle_host_event(event_name, &payload).await;
                }
                HookAction::Continue
            }
            .boxed()
        });
        hooks.register(event_name, callback);
    }

    tracing::info!(transport, engines = bridges.len(), "Mounted UI bridge");
    MountedBridge {
        bridges,
        adapter,
        transport,
    }
}
