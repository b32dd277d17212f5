//! Error types for playground-runtime.

use thiserror::Error;

use crate::session::SessionStatus;

/// Main error type for session-level operations.
///
/// Failures caused by user code never show up here; they are reported
/// inline through [`crate::execution::ExecutionFailure`].
#[derive(Error, Debug)]
pub enum PlaygroundError {
    /// The session has not finished initializing (or failed to).
    #[error("session not ready: current status is {0:?}")]
    NotReady(SessionStatus),

    /// Another execution or installation currently owns the interpreter.
    #[error("session busy: another execution is in flight")]
    Busy,

    /// Package installation failed. The installer message is kept verbatim.
    #[error("failed to install '{module}': {message}")]
    Installation { module: String, message: String },

    /// Module identifier is empty or malformed.
    #[error("invalid module name: {0:?}")]
    InvalidModuleName(String),

    /// Source text exceeds the configured limit.
    #[error("source too long: {length} bytes (max: {max})")]
    SourceTooLong { length: usize, max: usize },

    /// Source text contains a character the engines cannot carry.
    #[error("source contains invalid character: {0:?}")]
    InvalidCharacter(char),

    /// Invalid lifecycle transition attempted.
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// Engine bootstrap, process or protocol failure.
    #[error("engine error: {0}")]
    Engine(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl PlaygroundError {
    /// Whether the caller may retry the same request later unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady(SessionStatus::Initializing) | Self::Busy)
    }
}

impl From<crate::engine::EngineError> for PlaygroundError {
    fn from(err: crate::engine::EngineError) -> Self {
        match err {
            crate::engine::EngineError::Install { module, message } => {
                Self::Installation { module, message }
            }
            other => Self::Engine(other.to_string()),
        }
    }
}

/// Convenience Result type for playground-runtime operations.
pub type Result<T> = std::result::Result<T, PlaygroundError>;
