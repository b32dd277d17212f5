//! Interpreter collaborators.
//!
//! The session never evaluates code itself. It drives an
//! [`InterpreterEngine`] for Python and a [`ScriptHost`] for the alternate
//! language path:
//!
//! - [`PythonProcessEngine`]: persistent `python3` child process speaking a
//!   JSON-lines protocol
//! - [`NodeScriptHost`]: one-shot `node` process per JavaScript snippet
//!
//! Both are replaceable; tests use the scripted doubles in
//! [`crate::testing`].

mod javascript;
mod missing;
mod protocol;
mod python;

use async_trait::async_trait;
use thiserror::Error;

use crate::output::OutputSink;

pub use javascript::NodeScriptHost;
pub use missing::{missing_module, parse_missing_module};
pub use protocol::{DriverRequest, DriverResponse};
pub use python::{PythonEngineConfig, PythonLoader, PythonProcessEngine};

/// Failure reported by an engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// User code (or the runtime on its behalf) raised an exception.
    #[error("{kind}: {message}")]
    Raised {
        /// Exception type name, e.g. `ZeroDivisionError`.
        kind: String,
        /// Exception message.
        message: String,
        /// Missing module name, when the engine knows it structurally.
        module: Option<String>,
        /// Formatted traceback, if the engine produced one.
        traceback: Option<String>,
    },

    /// The package installer failed.
    #[error("failed to install '{module}': {message}")]
    Install { module: String, message: String },

    /// Malformed or unexpected protocol frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The engine process went away.
    #[error("engine process exited")]
    Exited,

    /// The engine process could not be started.
    #[error("failed to start engine: {0}")]
    Spawn(#[source] std::io::Error),

    /// I/O error talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Shorthand for an exception without traceback or module info.
    pub fn raised(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            kind: kind.into(),
            message: message.into(),
            module: None,
            traceback: None,
        }
    }

    /// Whether this is a failure of user code rather than of the engine.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Raised { .. })
    }
}

/// An embeddable interpreter that the session drives one call at a time.
///
/// Implementations are not reentrant; the session guarantees that at most
/// one method runs at any moment.
#[async_trait]
pub trait InterpreterEngine: Send {
    /// Short engine name for logs and status reports.
    fn name(&self) -> &str;

    /// Start sending the interpreter's standard output into `sink`.
    async fn redirect_output(&mut self, sink: OutputSink) -> Result<(), EngineError>;

    /// Put the interpreter's real standard output back.
    async fn restore_output(&mut self) -> Result<(), EngineError>;

    /// Replace the top-level namespace with a clean one, keeping `preserve`.
    async fn reset_namespace(&mut self, preserve: &[String]) -> Result<(), EngineError>;

    /// Evaluate source text. Returns the display form of the last
    /// expression, if there was one and it was not `None`.
    async fn evaluate(&mut self, source: &str) -> Result<Option<String>, EngineError>;

    /// Fetch and register an importable module.
    async fn install_module(&mut self, name: &str) -> Result<(), EngineError>;

    /// Abandon whatever the interpreter is doing and make it usable again.
    ///
    /// Called after a deadline or cancellation dropped an in-flight
    /// `evaluate`. Namespace state may be lost.
    async fn interrupt(&mut self) -> Result<(), EngineError>;
}

/// Acquires an interpreter. This is the slow step of session start-up.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// Bring up a fresh engine instance.
    async fn load(&self) -> Result<Box<dyn InterpreterEngine>, EngineError>;
}

/// Outcome of one run on a [`ScriptHost`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// Lines passed to the host logging primitive, in call order.
    pub logs: Vec<String>,
    /// Display form of the completion value, if any.
    pub value: Option<String>,
    /// Error description if evaluation threw.
    pub error: Option<String>,
}

/// Synchronous scripting engine used for the non-Python language path.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Short host name for logs.
    fn name(&self) -> &str;

    /// Run `source` to completion, capturing log output.
    ///
    /// Errors thrown by the script are reported in
    /// [`ScriptOutcome::error`]; `Err` means the host itself failed.
    async fn run(&self, source: &str) -> Result<ScriptOutcome, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raised_display() {
        let err = EngineError::raised("ZeroDivisionError", "division by zero");
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_engine_failures_are_not_user_errors() {
        assert!(!EngineError::Exited.is_user_error());
        assert!(!EngineError::Protocol("x".into()).is_user_error());
        let install = EngineError::Install {
            module: "foo".into(),
            message: "nope".into(),
        };
        assert!(!install.is_user_error());
        assert!(install.to_string().contains("foo"));
    }
}
