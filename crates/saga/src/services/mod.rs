//! Collaborator traits consumed by saga steps, with in-memory implementations.
//!
//! The real identity, billing and payment services live behind RPC
//! transports; the in-memory versions here back the default service wiring
//! and the tests. All of them record calls into an optional shared
//! [`CallLog`], honour cancellation of the [`SagaContext`](crate::SagaContext),
//! and can be told to fail a named operation.

pub mod billing;
pub mod call_log;
pub mod identity;
pub mod payment;

pub use billing::{
    BillingService, DEFAULT_CURRENCY, InMemoryBillingService, Invoice, InvoiceStatus,
    InvoiceUpdate, NewInvoice, Plan, Subscription, SubscriptionStatus,
};
pub use call_log::CallLog;
pub use identity::{CreatedUser, Gender, IdentityService, InMemoryIdentityService, NewUser};
pub use payment::{
    InMemoryPaymentService, PAYMENT_STATUS_FAILED, PAYMENT_STATUS_SUCCESS, PaymentOutcome,
    PaymentRequest, PaymentService,
};
