//! Saga orchestration for tenant registration and plan changes.
//!
//! This crate provides a generic coordinator that runs an ordered list of
//! steps against one run's state and, when a step fails, compensates the
//! steps that already succeeded in reverse order.
//!
//! Two sagas are built on it:
//! 1. Registration: create user → create default subscription
//! 2. Change plan: get subscription → get plan → create invoice →
//!    process payment → mark invoice paid → apply new plan →
//!    update tenant plan
//!
//! Collaborators (identity, billing, payment) are reached through the traits
//! in [`services`].

pub mod change_plan;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod journal;
pub mod orchestrator;
pub mod registration;
pub mod services;
pub mod state;
pub mod step;

pub use change_plan::{ChangePlanSaga, UpgradeSubscriptionRequest, UpgradeSubscriptionResponse};
pub use context::SagaContext;
pub use coordinator::SagaCoordinator;
pub use error::SagaError;
pub use events::SagaEvent;
pub use journal::SagaJournal;
pub use orchestrator::OrchestratorService;
pub use registration::{RegisterRequest, RegisterResponse, RegistrationSaga};
pub use services::{
    BillingService, CallLog, Gender, IdentityService, InMemoryBillingService,
    InMemoryIdentityService, InMemoryPaymentService, PaymentService,
};
pub use state::SagaStatus;
pub use step::SagaStep;
