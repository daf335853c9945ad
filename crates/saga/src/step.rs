//! The reversible unit of cross-service work.

use async_trait::async_trait;

use crate::context::SagaContext;
use crate::error::SagaError;

/// One step of a saga: a forward action and its best-effort inverse.
///
/// Steps hold only their collaborator handles. The run's state `S` is owned
/// by the caller and lent to each call, so a step value can be reused across
/// runs.
///
/// `execute` must record every identifier its compensation needs before
/// returning `Ok`, and must not write to `state` when it fails.
/// `compensate` must be safe to call when `execute` never recorded anything;
/// it checks for the recorded identifier and does nothing without it.
#[async_trait]
pub trait SagaStep<S: Send>: Send + Sync {
    /// Stable step name used in logs and the run journal.
    fn name(&self) -> &'static str;

    /// Performs the forward side effect.
    async fn execute(&self, ctx: &SagaContext, state: &mut S) -> Result<(), SagaError>;

    /// Undoes the forward side effect.
    ///
    /// The default implementation is a no-op, suitable for read-only steps.
    async fn compensate(&self, ctx: &SagaContext, state: &mut S) -> Result<(), SagaError> {
        let _ = (ctx, state);
        Ok(())
    }
}
