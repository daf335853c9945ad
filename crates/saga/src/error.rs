//! Saga error types.

use thiserror::Error;

/// Errors that can occur while running or compensating a saga.
///
/// Collaborator failures carry the remote error text only; the coordinator
/// treats every variant the same way and never inspects it.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Identity service error.
    #[error("Identity service error: {0}")]
    Identity(String),

    /// Billing service error.
    #[error("Billing service error: {0}")]
    Billing(String),

    /// Payment service error.
    #[error("Payment service error: {0}")]
    Payment(String),

    /// The payment service answered, but with a non-success status.
    #[error("Payment {status}: {message}")]
    PaymentDeclined { status: String, message: String },

    /// Updating the tenant's plan record failed.
    #[error("failed to update tenant plan: {0}")]
    TenantPlanUpdate(#[source] Box<SagaError>),

    /// A referenced resource does not exist in the collaborator.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: i64 },

    /// A step needed a value that an earlier step should have recorded.
    #[error("Saga state is missing {0}")]
    MissingState(&'static str),

    /// The invocation context was cancelled before the call completed.
    #[error("Saga context cancelled")]
    Cancelled,

    /// Saga has already been started.
    #[error("Saga has already been started")]
    AlreadyStarted,
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
