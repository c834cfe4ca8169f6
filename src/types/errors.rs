//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the UI bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// No command handler registered for the command type.
    #[error("unknown command type: {0}")]
    UnknownCommand(String),

    /// Validation errors (malformed events, commands or arguments).
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration could not be merged or resolved.
    #[error("configuration error: {0}")]
    Config(String),

    /// A handler, filter, transform or enricher failed.
    #[error("registrant error: {0}")]
    Registrant(String),

    /// Transport setup or teardown failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A command handler ran but reported failure.
    #[error("command failed: {0}")]
    Command(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code, reported to UIs in `command_error` events.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::UnknownCommand(_) => "UNKNOWN_COMMAND",
            Error::Validation(_) => "INVALID_ARGUMENT",
            Error::Config(_) => "FAILED_PRECONDITION",
            Error::Registrant(_) => "INTERNAL",
            Error::Transport(_) => "UNAVAILABLE",
            Error::Command(_) => "ABORTED",
            Error::Serialization(_) => "INVALID_ARGUMENT",
            Error::Io(_) => "UNAVAILABLE",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn unknown_command(command_type: impl Into<String>) -> Self {
        Self::UnknownCommand(command_type.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn registrant(msg: impl Into<String>) -> Self {
        Self::Registrant(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }
}
