//! # UI Bridge - Host Events to UI Events
//!
//! Translates lifecycle events from an agent-orchestration runtime (session
//! start/end, streamed content blocks, tool invocations, orchestrator
//! completion) into a normalized, transport-agnostic event stream any UI
//! front-end can consume, and routes UI commands back.
//!
//! - Configurable gating by event-name globs and presets
//! - Start/end correlation (thinking blocks, tool calls) via parent ids
//! - Handler / filter / transform / enricher pipeline with failure isolation
//! - Interchangeable transports: in-process queue, JSON lines, WebSocket
//! - Forwarders for embedding in an existing server
//!
//! ## Architecture
//!
//! ```text
//!   host hooks ──► mount ──► UiBridge ──► UiAdapter ──► UI
//!                              │  ▲            │
//!                 translation ─┘  └── commands ◄┘
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod adapters;
pub mod bridge;
pub mod events;
pub mod forwarder;
pub mod mount;
pub mod schema;
pub mod types;

// Internal utilities
pub mod observability;

pub use adapters::{BroadcastAdapter, LineStreamAdapter, MockAdapter, QueueAdapter, UiAdapter};
pub use bridge::UiBridge;
pub use forwarder::{BatchEventForwarder, EventForwarder, EventSender};
pub use mount::{mount, BridgeContext, HookAction, HookRegistry, HostHooks, MountedBridge};
pub use schema::{UiCommand, UiEvent};
pub use types::{BridgeConfig, Error, Result};
