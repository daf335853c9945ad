//! Events recorded while a saga runs.

use chrono::{DateTime, Utc};
use common::SagaId;
use serde::{Deserialize, Serialize};

/// Events that can occur during one saga run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga execution started.
    SagaStarted(SagaStartedData),

    /// A forward step started execution.
    StepStarted(StepData),

    /// A forward step completed successfully.
    StepCompleted(StepData),

    /// A forward step failed.
    StepFailed(StepFailedData),

    /// Compensation started after a step failure.
    CompensationStarted(CompensationData),

    /// A compensation completed successfully.
    CompensationStepCompleted(StepData),

    /// A compensation failed (logged, compensation continues).
    CompensationStepFailed(StepFailedData),

    /// Saga completed successfully.
    SagaCompleted(SagaFinishedData),

    /// Saga failed after compensation.
    SagaFailed(SagaFailedData),
}

impl SagaEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::StepStarted(_) => "StepStarted",
            SagaEvent::StepCompleted(_) => "StepCompleted",
            SagaEvent::StepFailed(_) => "StepFailed",
            SagaEvent::CompensationStarted(_) => "CompensationStarted",
            SagaEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            SagaEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            SagaEvent::SagaCompleted(_) => "SagaCompleted",
            SagaEvent::SagaFailed(_) => "SagaFailed",
        }
    }
}

/// Data for SagaStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaStartedData {
    /// The run's correlation ID.
    pub saga_id: SagaId,
    /// The type of saga (e.g., "Registration").
    pub saga_type: String,
    /// When the saga started.
    pub started_at: DateTime<Utc>,
}

/// Data for step events that only carry the step name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    /// The step name.
    pub step_name: String,
}

/// Data for StepFailed and CompensationStepFailed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailedData {
    /// The step that failed.
    pub step_name: String,
    /// Error message describing the failure.
    pub error: String,
}

/// Data for CompensationStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationData {
    /// The step that triggered compensation.
    pub from_step: String,
}

/// Data for SagaCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaFinishedData {
    /// When the saga completed.
    pub completed_at: DateTime<Utc>,
}

/// Data for SagaFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaFailedData {
    /// Reason for failure.
    pub reason: String,
    /// When the saga failed.
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl SagaEvent {
    /// Creates a SagaStarted event.
    pub fn saga_started(saga_id: SagaId, saga_type: impl Into<String>) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            saga_id,
            saga_type: saga_type.into(),
            started_at: Utc::now(),
        })
    }

    /// Creates a StepStarted event.
    pub fn step_started(step_name: impl Into<String>) -> Self {
        SagaEvent::StepStarted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a StepCompleted event.
    pub fn step_completed(step_name: impl Into<String>) -> Self {
        SagaEvent::StepCompleted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a StepFailed event.
    pub fn step_failed(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::StepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    /// Creates a CompensationStarted event.
    pub fn compensation_started(from_step: impl Into<String>) -> Self {
        SagaEvent::CompensationStarted(CompensationData {
            from_step: from_step.into(),
        })
    }

    /// Creates a CompensationStepCompleted event.
    pub fn compensation_step_completed(step_name: impl Into<String>) -> Self {
        SagaEvent::CompensationStepCompleted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a CompensationStepFailed event.
    pub fn compensation_step_failed(
        step_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        SagaEvent::CompensationStepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    /// Creates a SagaCompleted event.
    pub fn saga_completed() -> Self {
        SagaEvent::SagaCompleted(SagaFinishedData {
            completed_at: Utc::now(),
        })
    }

    /// Creates a SagaFailed event.
    pub fn saga_failed(reason: impl Into<String>) -> Self {
        SagaEvent::SagaFailed(SagaFailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }
}
