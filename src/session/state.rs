//! Session status machine.

use serde::Serialize;

/// Lifecycle status of a playground session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Interpreter is being acquired.
    #[default]
    Initializing,
    /// Interpreter is loaded and accepts executions.
    Ready,
    /// Interpreter could not be acquired.
    Failed,
}

impl SessionStatus {
    /// Check if transition to target status is valid.
    ///
    /// Valid transitions:
    /// - Initializing -> Ready
    /// - Initializing -> Failed
    /// - Failed -> Initializing (retry)
    pub fn can_transition_to(&self, target: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (*self, target),
            (Initializing, Ready) | (Initializing, Failed) | (Failed, Initializing)
        )
    }

    /// Attempt to transition to a new status.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: SessionStatus) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::PlaygroundError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if the session accepts executions.
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionStatus::Ready)
    }
}
