//! HTTP route handlers and shared state.

pub mod auth;
pub mod health;
pub mod metrics;
pub mod subscriptions;

use saga::{OrchestratorService, SagaContext};
use tokio_util::sync::CancellationToken;

/// Shared application state for the saga routes.
pub struct AppState {
    pub orchestrator: OrchestratorService,
    /// Parent of every request's saga context. Cancelled on shutdown so
    /// in-flight sagas stop calling collaborators and roll back.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(orchestrator: OrchestratorService) -> Self {
        Self {
            orchestrator,
            shutdown: CancellationToken::new(),
        }
    }

    /// Builds a fresh context for one saga run.
    pub fn saga_context(&self) -> SagaContext {
        SagaContext::with_cancellation(self.shutdown.child_token())
    }
}
