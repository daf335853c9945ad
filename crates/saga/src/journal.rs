//! In-memory record of one saga run.

use common::SagaId;
use serde::Serialize;

use crate::events::SagaEvent;
use crate::state::SagaStatus;

/// The journal of a single saga run.
///
/// Every event the coordinator emits is folded into the journal, so after a
/// run it answers which steps succeeded, which were compensated, and which
/// compensations failed. The journal lives as long as the coordinator and is
/// never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SagaJournal {
    saga_id: Option<SagaId>,
    saga_type: String,
    status: SagaStatus,
    completed_steps: Vec<String>,
    compensated_steps: Vec<String>,
    failed_compensations: Vec<String>,
    failure_reason: Option<String>,
    events: Vec<SagaEvent>,
}

impl SagaJournal {
    /// Records an event and applies it to the journal's view.
    pub fn record(&mut self, event: SagaEvent) {
        match &event {
            SagaEvent::SagaStarted(data) => {
                self.saga_id = Some(data.saga_id);
                self.saga_type = data.saga_type.clone();
                self.status = SagaStatus::Running;
            }
            SagaEvent::StepStarted(_) => {}
            SagaEvent::StepCompleted(data) => {
                self.completed_steps.push(data.step_name.clone());
            }
            SagaEvent::StepFailed(data) => {
                self.failure_reason = Some(data.error.clone());
            }
            SagaEvent::CompensationStarted(_) => {
                self.status = SagaStatus::Compensating;
            }
            SagaEvent::CompensationStepCompleted(data) => {
                self.compensated_steps.push(data.step_name.clone());
            }
            SagaEvent::CompensationStepFailed(data) => {
                self.failed_compensations.push(data.step_name.clone());
            }
            SagaEvent::SagaCompleted(_) => {
                self.status = SagaStatus::Succeeded;
            }
            SagaEvent::SagaFailed(data) => {
                self.status = SagaStatus::Failed;
                self.failure_reason = Some(data.reason.clone());
            }
        }
        self.events.push(event);
    }
}

// Query methods
impl SagaJournal {
    /// Returns the run's correlation ID, once started.
    pub fn saga_id(&self) -> Option<SagaId> {
        self.saga_id
    }

    /// Returns the saga type.
    pub fn saga_type(&self) -> &str {
        &self.saga_type
    }

    /// Returns the run status as seen by the journal.
    pub fn status(&self) -> SagaStatus {
        self.status
    }

    /// Returns the names of steps whose forward action succeeded, in order.
    pub fn completed_steps(&self) -> &[String] {
        &self.completed_steps
    }

    /// Returns the names of steps compensated successfully, in the order
    /// compensation ran.
    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated_steps
    }

    /// Returns the names of steps whose compensation failed.
    pub fn failed_compensations(&self) -> &[String] {
        &self.failed_compensations
    }

    /// Returns the failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns every recorded event in order.
    pub fn events(&self) -> &[SagaEvent] {
        &self.events
    }
}
