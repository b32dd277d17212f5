//! Execution result types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Language;
use crate::engine::{missing_module, EngineError};

/// Why an execution did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An import failed and recovery could not fix it.
    MissingModule,
    /// The recovery cycle could not install the missing module.
    Installation,
    /// User code raised.
    Evaluation,
    /// The deadline expired.
    Timeout,
    /// The caller cancelled.
    Cancelled,
}

/// Inline failure carried by an [`ExecutionResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// One-line description, e.g. `ZeroDivisionError: division by zero`.
    pub message: String,
    /// Module involved, for missing-module and installation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Full traceback when the engine provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ExecutionFailure {
    /// Create a failure without module or traceback.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            module: None,
            traceback: None,
        }
    }

    /// Classify an engine error.
    pub fn from_engine(err: &EngineError) -> Self {
        match err {
            EngineError::Raised { traceback, .. } => {
                let module = missing_module(err);
                let kind = if module.is_some() {
                    FailureKind::MissingModule
                } else {
                    FailureKind::Evaluation
                };
                Self {
                    kind,
                    message: err.to_string(),
                    module,
                    traceback: traceback.clone(),
                }
            }
            EngineError::Install { module, .. } => Self {
                kind: FailureKind::Installation,
                message: err.to_string(),
                module: Some(module.clone()),
                traceback: None,
            },
            other => Self::new(FailureKind::Evaluation, other.to_string()),
        }
    }

    /// Deadline expiry.
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("execution timed out after {:.1}s", after.as_secs_f64()),
        )
    }

    /// Caller cancellation.
    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "execution cancelled")
    }

    /// Text shown to the user: the traceback if there is one.
    pub fn description(&self) -> &str {
        self.traceback.as_deref().unwrap_or(&self.message)
    }
}

/// Result of one execution.
///
/// `value` and `failure` are never both set. `stdout` may be non-empty
/// alongside a failure since output can precede it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Captured output, in emission order.
    pub stdout: String,
    /// Display form of the last expression, on success.
    pub value: Option<String>,
    /// Failure description, on failure.
    pub failure: Option<ExecutionFailure>,
    /// Language the snippet ran as.
    pub language: Language,
    /// Wall-clock time spent.
    pub duration: Duration,
    /// Modules installed by the recovery cycle during this call.
    pub installed: Vec<String>,
}

impl ExecutionResult {
    /// A successful execution.
    pub fn success(
        language: Language,
        stdout: String,
        value: Option<String>,
        duration: Duration,
    ) -> Self {
        Self {
            stdout,
            value,
            failure: None,
            language,
            duration,
            installed: Vec::new(),
        }
    }

    /// A failed execution.
    pub fn failure(
        language: Language,
        stdout: String,
        failure: ExecutionFailure,
        duration: Duration,
    ) -> Self {
        Self {
            stdout,
            value: None,
            failure: Some(failure),
            language,
            duration,
            installed: Vec::new(),
        }
    }

    /// Record modules installed while producing this result.
    pub fn with_installed(mut self, installed: Vec<String>) -> Self {
        self.installed = installed;
        self
    }

    /// Check if execution succeeded.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Check if execution failed.
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Failure kind, if any.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }

    /// Error text shown to the user, if any.
    pub fn error_description(&self) -> Option<&str> {
        self.failure.as_ref().map(ExecutionFailure::description)
    }

    /// Get output as string, trimmed.
    pub fn output_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Get output lines.
    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }
}
