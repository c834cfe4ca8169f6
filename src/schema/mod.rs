//! Wire schema for outbound UI events and inbound UI commands.
//!
//! Both envelopes are plain JSON objects and travel unchanged over every
//! transport (in-process queue, JSON lines, WebSocket). Absent optional
//! fields are omitted from the wire form entirely, never sent as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{CommandId, Error, EventId, Result};

/// Type tag of the broadcast batch envelope.
pub const BATCH_ENVELOPE_TYPE: &str = "batch";

/// Normalized event delivered to UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub data: Map<String, Value>,

    /// Generated when absent on the wire.
    #[serde(default)]
    pub event_id: EventId,

    /// Id of the start-class event this event closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<EventId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// UI conversation thread, for multi-conversation front-ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Delegated sub-agent that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,

    /// Platform-specific rendering hints (priority, ephemeral, indent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Map<String, Value>>,
}

impl UiEvent {
    /// Create an event stamped now with a fresh id.
    ///
    /// Object payloads become `data` directly; any other JSON value is
    /// wrapped as `{"value": ...}`.
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            data: into_object(data),
            event_id: EventId::new(),
            parent_event_id: None,
            session_id: None,
            conversation_id: None,
            agent_name: None,
            hints: None,
        }
    }

    pub fn with_event_id(mut self, event_id: EventId) -> Self {
        self.event_id = event_id;
        self
    }

    pub fn with_parent(mut self, parent_event_id: Option<EventId>) -> Self {
        self.parent_event_id = parent_event_id;
        self
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_agent(mut self, agent_name: Option<String>) -> Self {
        self.agent_name = agent_name;
        self
    }

    pub fn with_hints(mut self, hints: Option<Map<String, Value>>) -> Self {
        self.hints = hints;
        self
    }

    /// Shorthand for reading a data field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Command sent from a UI back to the host runtime.
///
/// Opaque to the engine apart from `type`, which selects the handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiCommand {
    #[serde(rename = "type")]
    pub command_type: String,

    #[serde(default)]
    pub data: Map<String, Value>,

    /// Generated when absent on the wire; used to correlate responses.
    #[serde(default)]
    pub command_id: CommandId,
}

impl UiCommand {
    pub fn new(command_type: impl Into<String>, data: Value) -> Self {
        Self {
            command_type: command_type.into(),
            data: into_object(data),
            command_id: CommandId::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a command, rejecting an empty `type`.
    pub fn from_json(s: &str) -> Result<Self> {
        let command: Self = serde_json::from_str(s)?;
        if command.command_type.trim().is_empty() {
            return Err(Error::validation("command type must not be empty"));
        }
        Ok(command)
    }
}

/// Standard command type names.
pub mod command_types {
    pub const SUBMIT_PROMPT: &str = "submit_prompt";
    pub const CANCEL_GENERATION: &str = "cancel_generation";
    pub const SWITCH_SESSION: &str = "switch_session";
    pub const CREATE_SESSION: &str = "create_session";
    pub const DELETE_SESSION: &str = "delete_session";
    pub const LOAD_PROFILE: &str = "load_profile";
    pub const UPDATE_CONFIG: &str = "update_config";
    pub const CUSTOM: &str = "custom";
}

/// `{"type": "batch", "events": [...]}` sent by broadcast transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEnvelope {
    #[serde(rename = "type")]
    pub envelope_type: String,
    pub events: Vec<UiEvent>,
}

impl BatchEnvelope {
    /// Serialize a batch without cloning the events.
    pub fn encode(events: &[UiEvent]) -> Result<String> {
        #[derive(Serialize)]
        struct Borrowed<'a> {
            #[serde(rename = "type")]
            envelope_type: &'static str,
            events: &'a [UiEvent],
        }

        Ok(serde_json::to_string(&Borrowed {
            envelope_type: BATCH_ENVELOPE_TYPE,
            events,
        })?)
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
