//! API request and response types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::execution::{ExecutionResult, FailureKind, Language};
use crate::session::SessionStatus;

/// Request to execute a snippet.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    /// Source text to run.
    pub source: String,
    /// Language selector, Python when omitted.
    #[serde(default)]
    pub language: Language,
    /// Deadline in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ExecuteRequest {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Failure details in an execution response.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteError {
    /// Failure category.
    pub kind: FailureKind,
    /// Text shown to the user (traceback when available).
    pub description: String,
    /// Module involved, for missing-module and installation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

/// Response for snippet execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    /// Whether the snippet ran to completion.
    pub success: bool,
    /// Language the snippet ran as.
    pub language: Language,
    /// Captured output.
    pub stdout: String,
    /// Display form of the last expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecuteError>,
    /// Modules installed by the recovery cycle.
    pub installed: Vec<String>,
    /// Execution duration in milliseconds.
    pub duration_ms: u64,
}

impl ExecuteResponse {
    pub fn from_result(result: &ExecutionResult) -> Self {
        Self {
            success: result.is_success(),
            language: result.language,
            stdout: result.stdout.clone(),
            value: result.value.clone(),
            error: result.failure.as_ref().map(|f| ExecuteError {
                kind: f.kind,
                description: f.description().to_string(),
                module: f.module.clone(),
            }),
            installed: result.installed.clone(),
            duration_ms: result.duration.as_millis() as u64,
        }
    }
}

/// Request to install a package.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallRequest {
    /// Module name.
    pub name: String,
}

/// Response listing installed packages.
#[derive(Debug, Clone, Serialize)]
pub struct PackagesResponse {
    /// Number of installed modules.
    pub count: usize,
    /// Installed modules, sorted.
    pub packages: Vec<String>,
}

impl PackagesResponse {
    pub fn new(packages: Vec<String>) -> Self {
        Self {
            count: packages.len(),
            packages,
        }
    }
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "NOT_READY").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_ready(status: SessionStatus) -> Self {
        Self::new(
            "NOT_READY",
            format!("Session is {:?} and cannot execute code", status),
        )
    }

    pub fn busy() -> Self {
        Self::new("BUSY", "Another execution is in progress")
    }

    pub fn installation_failed(module: &str, message: impl Into<String>) -> Self {
        Self::new(
            "INSTALLATION_FAILED",
            format!("Failed to install '{}'", module),
        )
        .with_details(message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }
}
