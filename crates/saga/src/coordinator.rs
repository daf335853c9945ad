//! Saga coordinator: runs steps forward and compensates on failure.

use crate::context::SagaContext;
use crate::error::SagaError;
use crate::events::SagaEvent;
use crate::journal::SagaJournal;
use crate::state::SagaStatus;
use crate::step::SagaStep;

/// Executes an ordered list of steps against one saga run's state.
///
/// Steps run strictly in declaration order. When a step fails, every step
/// that already succeeded is compensated in reverse order; compensation
/// failures are logged and never stop the remaining compensations. The
/// caller gets back the error of the step that failed.
///
/// A coordinator is single-use: once `execute` has been called, later calls
/// return [`SagaError::AlreadyStarted`].
pub struct SagaCoordinator<S: Send> {
    saga_type: &'static str,
    steps: Vec<Box<dyn SagaStep<S>>>,
    status: SagaStatus,
    journal: SagaJournal,
}

impl<S: Send> SagaCoordinator<S> {
    /// Creates a coordinator with no steps.
    pub fn new(saga_type: &'static str) -> Self {
        Self::from_steps(saga_type, Vec::new())
    }

    /// Creates a coordinator from an already assembled step list.
    pub fn from_steps(saga_type: &'static str, steps: Vec<Box<dyn SagaStep<S>>>) -> Self {
        Self {
            saga_type,
            steps,
            status: SagaStatus::Idle,
            journal: SagaJournal::default(),
        }
    }

    /// Appends a step to the end of the run.
    pub fn with_step(mut self, step: impl SagaStep<S> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Returns the saga type this coordinator runs.
    pub fn saga_type(&self) -> &'static str {
        self.saga_type
    }

    /// Returns the declared step names in order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Returns the current lifecycle status.
    pub fn status(&self) -> SagaStatus {
        self.status
    }

    /// Returns the journal of this run.
    pub fn journal(&self) -> &SagaJournal {
        &self.journal
    }

    /// Runs the saga against `state`.
    ///
    /// Returns `Ok(())` once every step succeeded, or the failing step's
    /// error after all earlier steps have been compensated. Compensations
    /// run under a detached context, so cancelling `ctx` stops the forward
    /// pass but not the rollback.
    #[tracing::instrument(skip_all, fields(saga_type = self.saga_type, saga_id = %ctx.saga_id()))]
    pub async fn execute(&mut self, ctx: &SagaContext, state: &mut S) -> Result<(), SagaError> {
        if !self.status.can_run() {
            return Err(SagaError::AlreadyStarted);
        }

        metrics::counter!("saga_executions_total", "saga_type" => self.saga_type).increment(1);
        let saga_start = std::time::Instant::now();

        self.status = SagaStatus::Running;
        self.journal
            .record(SagaEvent::saga_started(ctx.saga_id(), self.saga_type));

        let mut executed: Vec<usize> = Vec::with_capacity(self.steps.len());
        let mut failure: Option<(&'static str, SagaError)> = None;

        for (index, step) in self.steps.iter().enumerate() {
            let step_name = step.name();
            tracing::info!(step = step_name, "saga step started");
            self.journal.record(SagaEvent::step_started(step_name));

            match step.execute(ctx, state).await {
                Ok(()) => {
                    executed.push(index);
                    self.journal.record(SagaEvent::step_completed(step_name));
                }
                Err(err) => {
                    tracing::warn!(step = step_name, error = %err, "saga step failed");
                    self.journal
                        .record(SagaEvent::step_failed(step_name, err.to_string()));
                    failure = Some((step_name, err));
                    break;
                }
            }
        }

        let result = match failure {
            None => {
                self.status = SagaStatus::Succeeded;
                self.journal.record(SagaEvent::saga_completed());
                metrics::counter!("saga_completed_total", "saga_type" => self.saga_type)
                    .increment(1);
                tracing::info!(steps = executed.len(), "saga completed successfully");
                Ok(())
            }
            Some((failed_step, err)) => {
                self.compensate(ctx, state, executed, failed_step).await;
                self.status = SagaStatus::Failed;
                self.journal.record(SagaEvent::saga_failed(format!(
                    "Step {failed_step} failed: {err}"
                )));
                metrics::counter!("saga_failed_total", "saga_type" => self.saga_type)
                    .increment(1);
                tracing::warn!(reason = %err, step = failed_step, "saga failed");
                Err(err)
            }
        };

        metrics::histogram!("saga_duration_seconds", "saga_type" => self.saga_type)
            .record(saga_start.elapsed().as_secs_f64());
        debug_assert!(self.status.is_terminal());

        result
    }

    /// Compensates the executed steps in reverse order.
    async fn compensate(
        &mut self,
        ctx: &SagaContext,
        state: &mut S,
        executed: Vec<usize>,
        failed_step: &'static str,
    ) {
        debug_assert!(self.status.can_compensate());
        self.status = SagaStatus::Compensating;
        let ctx = &ctx.detached();
        self.journal
            .record(SagaEvent::compensation_started(failed_step));
        tracing::info!(from_step = failed_step, "starting compensation");

        for index in executed.into_iter().rev() {
            let step = &self.steps[index];
            let step_name = step.name();
            tracing::info!(step = step_name, "compensating saga step");

            match step.compensate(ctx, state).await {
                Ok(()) => {
                    self.journal
                        .record(SagaEvent::compensation_step_completed(step_name));
                }
                Err(err) => {
                    metrics::counter!(
                        "saga_compensation_failures_total",
                        "saga_type" => self.saga_type
                    )
                    .increment(1);
                    tracing::error!(step = step_name, error = %err, "compensation failed");
                    self.journal
                        .record(SagaEvent::compensation_step_failed(step_name, err.to_string()));
                }
            }
        }

        tracing::info!("compensation finished");
    }
}

impl<S: Send> std::fmt::Debug for SagaCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaCoordinator")
            .field("saga_type", &self.saga_type)
            .field("steps", &self.step_names())
            .field("status", &self.status)
            .finish()
    }
}
