//! Invocation context threaded through every step and collaborator call.

use common::SagaId;
use tokio_util::sync::CancellationToken;

/// Per-run invocation context.
///
/// Carries the run's correlation ID and a cancellation token. Collaborators
/// observe the token and fail their call once it is cancelled, which the
/// coordinator handles like any other step failure. Compensations run under
/// a [`detached`](Self::detached) copy so a cancelled run can still roll back.
#[derive(Debug, Clone, Default)]
pub struct SagaContext {
    saga_id: SagaId,
    cancellation: CancellationToken,
}

impl SagaContext {
    /// Creates a context with a fresh saga ID and its own cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context tied to an externally owned cancellation token.
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            saga_id: SagaId::new(),
            cancellation,
        }
    }

    /// Returns the run's correlation ID.
    pub fn saga_id(&self) -> SagaId {
        self.saga_id
    }

    /// Cancels the context.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns true once the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns a context for the same run that cancelling this one does not
    /// reach.
    pub fn detached(&self) -> Self {
        Self {
            saga_id: self.saga_id,
            cancellation: CancellationToken::new(),
        }
    }

    /// Returns a token that is cancelled together with this context.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
