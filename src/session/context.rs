//! Per-session module registry and counters.

use std::collections::BTreeSet;
use std::time::SystemTime;

/// Module registry and execution counters for one session.
///
/// The installed set only grows. Nothing removes a module once it has
/// been confirmed installed.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Modules confirmed installed.
    installed: BTreeSet<String>,
    /// Completed executions.
    execution_count: u64,
    /// Executions that ended with a failure.
    failure_count: u64,
    /// Recovery cycles that reached the retry.
    recovery_count: u64,
    /// When the last execution finished.
    last_execution: Option<SystemTime>,
    /// Whether the last execution succeeded.
    last_succeeded: Option<bool>,
}

impl SessionContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a module is already installed.
    pub fn is_installed(&self, module: &str) -> bool {
        self.installed.contains(module)
    }

    /// Record a module as installed. Returns `false` if it already was.
    pub fn mark_installed(&mut self, module: impl Into<String>) -> bool {
        self.installed.insert(module.into())
    }

    /// Installed modules, sorted.
    pub fn installed_modules(&self) -> Vec<String> {
        self.installed.iter().cloned().collect()
    }

    /// Number of installed modules.
    pub fn installed_count(&self) -> usize {
        self.installed.len()
    }

    /// Record a finished execution.
    pub fn record_execution(&mut self, success: bool) {
        self.execution_count += 1;
        if !success {
            self.failure_count += 1;
        }
        self.last_execution = Some(SystemTime::now());
        self.last_succeeded = Some(success);
    }

    /// Record a recovery cycle.
    pub fn record_recovery(&mut self) {
        self.recovery_count += 1;
    }

    /// Get the number of executions.
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    /// Get the number of failed executions.
    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Get the number of recovery cycles.
    pub fn recovery_count(&self) -> u64 {
        self.recovery_count
    }

    /// When the last execution finished.
    pub fn last_execution(&self) -> Option<SystemTime> {
        self.last_execution
    }

    /// Check if the last execution succeeded.
    pub fn last_succeeded(&self) -> bool {
        self.last_succeeded == Some(true)
    }

    /// Check if the last execution failed.
    pub fn last_failed(&self) -> bool {
        self.last_succeeded == Some(false)
    }
}
