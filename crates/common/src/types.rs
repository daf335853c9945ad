use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one saga run.
///
/// Only used to correlate the log lines and journal entries of a single run;
/// it is never sent to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SagaId(Uuid);

impl SagaId {
    /// Creates a new random saga ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a saga ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SagaId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SagaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SagaId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Declares a numeric identifier issued by a remote service.
macro_rules! service_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

service_id!(
    /// User identifier issued by the identity service.
    UserId
);
service_id!(
    /// Tenant identifier issued by the identity service alongside a new user.
    TenantId
);
service_id!(
    /// Subscription identifier issued by the billing service.
    SubscriptionId
);
service_id!(
    /// Billing plan identifier.
    PlanId
);
service_id!(
    /// Invoice identifier issued by the billing service.
    InvoiceId
);
service_id!(
    /// Payment identifier issued by the payment service.
    PaymentId
);

impl PlanId {
    /// Returns true if this refers to a real plan (IDs start at 1).
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}
