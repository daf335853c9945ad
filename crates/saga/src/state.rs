//! Saga lifecycle state machine.

use serde::{Deserialize, Serialize};

/// The lifecycle status of one coordinator run.
///
/// State transitions:
/// ```text
/// Idle ──► Running ──┬──► Succeeded
///                    └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaStatus {
    /// Saga has not started yet.
    #[default]
    Idle,

    /// Forward steps are being executed.
    Running,

    /// A step failed and compensating actions are in progress.
    Compensating,

    /// All steps completed successfully (terminal state).
    Succeeded,

    /// Compensation finished after a failure (terminal state).
    Failed,
}

impl SagaStatus {
    /// Returns true if the saga can begin running.
    pub fn can_run(&self) -> bool {
        matches!(self, SagaStatus::Idle)
    }

    /// Returns true if the saga can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaStatus::Running)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStatus::Succeeded | SagaStatus::Failed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Idle => "Idle",
            SagaStatus::Running => "Running",
            SagaStatus::Compensating => "Compensating",
            SagaStatus::Succeeded => "Succeeded",
            SagaStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
