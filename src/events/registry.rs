//! Outbound event type registries.
//!
//! Two naming schemes exist side by side:
//! - [`native`]: pass-through of the host runtime's own event names, for UIs
//!   that want fine-grained streaming and tool events.
//! - [`ui`]: semantic, UI-friendly names for simpler front-ends.
//!
//! The translator works in terms of [`EventKind`] and asks the kind for its
//! name under the engine's [`NamingScheme`].

/// Naming scheme an engine emits with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingScheme {
    Native,
    UiFriendly,
}

/// Host runtime event names (native scheme).
pub mod native {
    pub const SESSION_START: &str = "session:start";
    pub const SESSION_END: &str = "session:end";

    pub const CONTENT_BLOCK_START: &str = "content_block:start";
    pub const CONTENT_BLOCK_DELTA: &str = "content_block:delta";
    pub const CONTENT_BLOCK_END: &str = "content_block:end";

    pub const THINKING_DELTA: &str = "thinking:delta";

    pub const TOOL_PRE: &str = "tool:pre";
    pub const TOOL_POST: &str = "tool:post";

    pub const ORCHESTRATOR_COMPLETE: &str = "orchestrator:complete";

    pub const PROVIDER_START: &str = "provider:start";
    pub const PROVIDER_END: &str = "provider:end";

    pub const APPROVAL_REQUESTED: &str = "approval:requested";
    pub const APPROVAL_RESOLVED: &str = "approval:resolved";

    pub const ERROR: &str = "error";
}

/// Semantic UI-friendly event names.
pub mod ui {
    pub const SESSION_START: &str = "session_start";
    pub const SESSION_END: &str = "session_end";
    pub const SESSION_ERROR: &str = "session_error";

    pub const THINKING_START: &str = "thinking_start";
    pub const THINKING_CHUNK: &str = "thinking_chunk";
    pub const THINKING_END: &str = "thinking_end";

    pub const TOOL_START: &str = "tool_start";
    pub const TOOL_PROGRESS: &str = "tool_progress";
    pub const TOOL_RESULT: &str = "tool_result";

    pub const MESSAGE_START: &str = "message_start";
    pub const MESSAGE_CHUNK: &str = "message_chunk";
    pub const MESSAGE_END: &str = "message_end";

    pub const TOKEN_USAGE: &str = "token_usage";
    pub const CONTEXT_UPDATE: &str = "context_update";

    pub const NOTIFICATION: &str = "notification";
    pub const ERROR: &str = "error";

    pub const COMMAND_RESULT: &str = "command_result";
    pub const COMMAND_ERROR: &str = "command_error";
}

/// Host events the mount layer subscribes the bridge to.
pub const MOUNTED_HOST_EVENTS: &[&str] = &[
    native::SESSION_START,
    native::SESSION_END,
    native::CONTENT_BLOCK_START,
    native::CONTENT_BLOCK_DELTA,
    native::CONTENT_BLOCK_END,
    native::THINKING_DELTA,
    native::TOOL_PRE,
    native::TOOL_POST,
    native::ORCHESTRATOR_COMPLETE,
];

/// Scheme-independent outbound event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    ContentBlockStart,
    ContentBlockDelta,
    ThinkingStart,
    ThinkingDelta,
    ThinkingEnd,
    ToolStart,
    ToolResult,
    MessageEnd,
    TokenUsage,
    Error,
    CommandResult,
    CommandError,
}

impl EventKind {
    /// Outbound `type` for this kind under `scheme`.
    ///
    /// Kinds with no native counterpart keep their UI-friendly name.
    pub fn name(self, scheme: NamingScheme) -> &'static str {
        match scheme {
            NamingScheme::Native => self.native_name().unwrap_or_else(|| self.ui_name()),
            NamingScheme::UiFriendly => self.ui_name(),
        }
    }

    fn native_name(self) -> Option<&'static str> {
        let name = match self {
            Self::SessionStart => native::SESSION_START,
            Self::SessionEnd => native::SESSION_END,
            Self::ContentBlockStart | Self::ThinkingStart => native::CONTENT_BLOCK_START,
            Self::ContentBlockDelta => native::CONTENT_BLOCK_DELTA,
            Self::ThinkingEnd => native::CONTENT_BLOCK_END,
            Self::ThinkingDelta => native::THINKING_DELTA,
            Self::ToolStart => native::TOOL_PRE,
            Self::ToolResult => native::TOOL_POST,
            Self::MessageEnd => native::ORCHESTRATOR_COMPLETE,
            Self::Error => native::ERROR,
            Self::TokenUsage | Self::CommandResult | Self::CommandError => return None,
        };
        Some(name)
    }

    fn ui_name(self) -> &'static str {
        match self {
            Self::SessionStart => ui::SESSION_START,
            Self::SessionEnd => ui::SESSION_END,
            Self::ContentBlockStart => ui::MESSAGE_START,
            Self::ContentBlockDelta => ui::MESSAGE_CHUNK,
            Self::ThinkingStart => ui::THINKING_START,
            Self::ThinkingDelta => ui::THINKING_CHUNK,
            Self::ThinkingEnd => ui::THINKING_END,
            Self::ToolStart => ui::TOOL_START,
            Self::ToolResult => ui::TOOL_RESULT,
            Self::MessageEnd => ui::MESSAGE_END,
            Self::TokenUsage => ui::TOKEN_USAGE,
            Self::Error => ui::ERROR,
            Self::CommandResult => ui::COMMAND_RESULT,
            Self::CommandError => ui::COMMAND_ERROR,
        }
    }
}
