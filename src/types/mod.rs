//! Core types for the UI bridge.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (EventId, CommandId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Bridge configuration, presets and transport selection

mod config;
mod errors;
mod ids;

pub use config::{
    deep_merge, AgentsConfig, BridgeConfig, DisplayConfig, EventMode, ForwarderConfig,
    HistoryConfig, Preset, TransportConfig,
};
pub use errors::{Error, Result};
pub use ids::{CommandId, EventId};
