//! Shared types for the orchestrator workspace.
//!
//! Identifiers handed out by the identity, billing and payment services are
//! wrapped in newtypes so a tenant ID can never be passed where a user ID is
//! expected.

mod money;
mod types;

pub use money::Money;
pub use types::{InvoiceId, PaymentId, PlanId, SagaId, SubscriptionId, TenantId, UserId};
