//! Configuration structures.
//!
//! User configuration arrives as a loose JSON mapping and is deep-merged over
//! the serialized defaults before being deserialized into [`BridgeConfig`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use super::errors::Error;
use crate::events::registry::NamingScheme;

/// Named shortcut for a set of event-name glob patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Minimal,
    Standard,
    Verbose,
    Debug,
}

impl Preset {
    /// Look up a preset by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "minimal" => Some(Self::Minimal),
            "standard" => Some(Self::Standard),
            "verbose" => Some(Self::Verbose),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }

    /// Host event patterns gated in by this preset.
    pub fn patterns(self) -> Vec<String> {
        let patterns: &[&str] = match self {
            Self::Minimal => &["tool:post", "error", "error:*"],
            Self::Standard => &[
                "session:*",
                "content_block:*",
                "tool:*",
                "token_usage",
                "orchestrator:*",
                "thinking:*",
            ],
            Self::Verbose | Self::Debug => &["*"],
        };
        patterns.iter().map(|p| p.to_string()).collect()
    }
}

/// Which registry's names the bridge emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    Native,
    #[default]
    UiFriendly,
    /// One engine per scheme, sharing the adapter (realised by the mount layer).
    Both,
}

impl EventMode {
    /// Naming schemes an engine must be built for, primary first.
    pub fn schemes(self) -> &'static [NamingScheme] {
        match self {
            Self::Native => &[NamingScheme::Native],
            Self::UiFriendly => &[NamingScheme::UiFriendly],
            Self::Both => &[NamingScheme::UiFriendly, NamingScheme::Native],
        }
    }
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BridgeConfig {
    /// Glob patterns gating which host event names are processed.
    pub events: Vec<String>,

    /// Named preset; overrides `events` when recognized.
    pub preset: Option<String>,

    /// Outbound naming scheme.
    pub event_mode: EventMode,

    /// Payload shaping.
    pub display: DisplayConfig,

    /// Sub-agent handling.
    pub agents: AgentsConfig,

    /// Optional in-memory ring buffer of emitted events.
    pub history: HistoryConfig,

    /// Transport selection used by the mount layer.
    pub transport: TransportConfig,

    /// Queue forwarder timings.
    pub forwarder: ForwarderConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            events: Preset::Standard.patterns(),
            preset: None,
            event_mode: EventMode::default(),
            display: DisplayConfig::default(),
            agents: AgentsConfig::default(),
            history: HistoryConfig::default(),
            transport: TransportConfig::default(),
            forwarder: ForwarderConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Deep-merge `overrides` over the defaults and resolve the preset.
    ///
    /// Nested mappings merge recursively; scalars and lists replace. An
    /// unrecognized preset name leaves `events` untouched.
    pub fn configure(overrides: Value) -> super::errors::Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        deep_merge(&mut merged, overrides);

        let mut config: Self = serde_json::from_value(merged)
            .map_err(|e| Error::config(format!("invalid bridge configuration: {}", e)))?;
        config.resolve_preset();
        Ok(config)
    }

    /// Replace `events` with the preset's patterns, if a known preset is set.
    pub fn resolve_preset(&mut self) {
        let Some(name) = self.preset.as_deref() else {
            return;
        };
        match Preset::from_name(name) {
            Some(preset) => self.events = preset.patterns(),
            None => {
                tracing::warn!(preset = name, "Unknown preset, keeping configured events");
            }
        }
    }

    /// JSON Schema describing the accepted configuration.
    pub fn json_schema() -> Value {
        let schema = schemars::schema_for!(BridgeConfig);
        serde_json::to_value(schema).unwrap_or(Value::Null)
    }
}

/// Payload shaping options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DisplayConfig {
    pub show_thinking: bool,
    pub show_tool_arguments: bool,
    pub show_tool_output: bool,

    /// Maximum length of truncated text fields; 0 disables truncation.
    pub truncate_output: usize,

    /// Attach `started_at` to tool results.
    pub include_timestamps: bool,

    /// Attach `duration_ms` to tool results.
    pub include_duration: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_thinking: true,
            show_tool_arguments: true,
            show_tool_output: true,
            truncate_output: 500,
            include_timestamps: true,
            include_duration: true,
        }
    }
}

/// Sub-agent options.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AgentsConfig {
    /// Derive `agent_name` from hierarchical session ids.
    pub parse_agent_names: bool,

    /// Hint UIs to indent events from delegated agents.
    pub indent_sub_agents: bool,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            parse_agent_names: true,
            indent_sub_agents: true,
        }
    }
}

/// Event history ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub max_events: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_events: 1000,
        }
    }
}

/// Transport the mount layer instantiates.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Bounded in-process queue.
    Queue {
        #[serde(default = "default_queue_name")]
        queue_name: String,
        #[serde(default = "default_max_queue_size")]
        max_queue_size: usize,
    },

    /// JSON lines over stdout/stdin (desktop sidecars).
    #[serde(alias = "tauri")]
    LineStream {},

    /// Broadcast WebSocket server.
    Websocket {
        #[serde(default = "default_ws_host")]
        host: String,
        #[serde(default = "default_ws_port")]
        port: u16,
    },

    /// Adapter built by a factory registered with the bridge context.
    Custom {
        adapter: String,
        #[serde(default)]
        adapter_config: Map<String, Value>,
    },
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Queue {
            queue_name: default_queue_name(),
            max_queue_size: default_max_queue_size(),
        }
    }
}

impl TransportConfig {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Queue { .. } => "queue",
            Self::LineStream {} => "line_stream",
            Self::Websocket { .. } => "websocket",
            Self::Custom { .. } => "custom",
        }
    }
}

fn default_queue_name() -> String {
    "default".to_string()
}

fn default_max_queue_size() -> usize {
    1000
}

fn default_ws_host() -> String {
    "localhost".to_string()
}

fn default_ws_port() -> u16 {
    8765
}

/// Queue forwarder timings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForwarderConfig {
    /// How long a forwarder waits on the queue before re-checking its stop signal.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub poll_interval: Duration,

    /// Maximum events per batch.
    pub batch_size: usize,

    /// Maximum time a partial batch is held before sending.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub batch_timeout: Duration,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            batch_size: 10,
            batch_timeout: Duration::from_millis(50),
        }
    }
}

/// Merge `overrides` into `base`: objects recurse, everything else replaces.
pub fn deep_merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            for (key, value) in override_map {
                let nested = value.is_object() && base_map.get(&key).is_some_and(Value::is_object);
                match base_map.get_mut(&key) {
                    Some(existing) if nested => deep_merge(existing, value),
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert!(config.display.show_thinking);
        assert_eq!(config.display.truncate_output, 500);
        assert_eq!(config.event_mode, EventMode::UiFriendly);
        assert_eq!(config.events, Preset::Standard.patterns());
        assert!(!config.history.enabled);
    }

    #[test]
    fn test_custom_config_merged() {
        let config = BridgeConfig::configure(json!({
            "display": {"show_thinking": false}
        }))
        .unwrap();

        assert!(!config.display.show_thinking);
        assert_eq!(config.display.truncate_output, 500);
        assert!(config.display.show_tool_output);
    }

    #[test]
    fn test_preset_overrides_events() {
        let config = BridgeConfig::configure(json!({
            "events": ["tool:*"],
            "preset": "verbose",
        }))
        .unwrap();
        assert_eq!(config.events, vec!["*".to_string()]);
    }

    #[test]
    fn test_unknown_preset_keeps_events() {
        let config = BridgeConfig::configure(json!({"preset": "chatty"})).unwrap();
        assert_eq!(config.events, Preset::Standard.patterns());
    }

    #[test]
    fn test_lists_replace_wholesale() {
        let config = BridgeConfig::configure(json!({"events": ["session:*"]})).unwrap();
        assert_eq!(config.events, vec!["session:*".to_string()]);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let err = BridgeConfig::configure(json!({"display": {"truncate_output": "lots"}}))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_transport_variants() {
        let config = BridgeConfig::configure(json!({
            "transport": {"type": "websocket", "port": 9001}
        }))
        .unwrap();
        assert_eq!(
            config.transport,
            TransportConfig::Websocket {
                host: "localhost".to_string(),
                port: 9001,
            }
        );

        let config = BridgeConfig::configure(json!({"transport": {"type": "tauri"}})).unwrap();
        assert_eq!(config.transport.kind(), "line_stream");
    }

    #[test]
    fn test_forwarder_durations_are_humantime() {
        let config = BridgeConfig::configure(json!({
            "forwarder": {"batch_timeout": "200ms"}
        }))
        .unwrap();
        assert_eq!(config.forwarder.batch_timeout, Duration::from_millis(200));
        assert_eq!(config.forwarder.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_deep_merge_nested() {
        let mut base = json!({"a": {"b": 1, "c": [1, 2]}, "d": "x"});
        deep_merge(&mut base, json!({"a": {"c": [3]}, "e": true}));
        assert_eq!(base, json!({"a": {"b": 1, "c": [3]}, "d": "x", "e": true}));
    }

    #[test]
    fn test_event_mode_schemes() {
        assert_eq!(EventMode::Both.schemes().len(), 2);
        assert_eq!(EventMode::Native.schemes(), &[NamingScheme::Native]);
    }

    #[test]
    fn test_json_schema_lists_sections() {
        let schema = BridgeConfig::json_schema();
        let props = &schema["properties"];
        assert!(props.get("display").is_some());
        assert!(props.get("history").is_some());
    }

    #[test]
    fn test_json_schema_describes_forwarder_durations_as_strings() {
        let schema = BridgeConfig::json_schema();
        let forwarder = &schema["definitions"]["ForwarderConfig"]["properties"];
        assert_eq!(forwarder["poll_interval"]["type"], "string");
        assert_eq!(forwarder["batch_timeout"]["type"], "string");
        assert_eq!(forwarder["batch_size"]["type"], "integer");
    }
}
