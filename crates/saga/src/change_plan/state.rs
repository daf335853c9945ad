use common::{InvoiceId, Money, PaymentId, PlanId, SubscriptionId, TenantId};

use crate::error::SagaError;

/// State of one plan change run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePlanState {
    // Input
    pub tenant_id: Option<TenantId>,
    pub subscription_id: SubscriptionId,
    pub new_plan_id: PlanId,

    // Working values
    /// Plan the subscription was on before the change, used for rollback.
    pub old_plan_id: Option<PlanId>,
    pub plan_price: Option<Money>,
    pub currency: Option<String>,

    // Output
    pub invoice_id: Option<InvoiceId>,
    pub payment_id: Option<PaymentId>,
    pub payment_status: Option<String>,
}

impl ChangePlanState {
    /// Creates the state for a run from its inputs.
    pub fn new(
        tenant_id: Option<TenantId>,
        subscription_id: SubscriptionId,
        new_plan_id: PlanId,
    ) -> Self {
        Self {
            tenant_id,
            subscription_id,
            new_plan_id,
            old_plan_id: None,
            plan_price: None,
            currency: None,
            invoice_id: None,
            payment_id: None,
            payment_status: None,
        }
    }

    pub(crate) fn require_tenant_id(&self) -> Result<TenantId, SagaError> {
        self.tenant_id.ok_or(SagaError::MissingState("tenant_id"))
    }

    pub(crate) fn require_plan_price(&self) -> Result<Money, SagaError> {
        self.plan_price.ok_or(SagaError::MissingState("plan_price"))
    }

    pub(crate) fn require_currency(&self) -> Result<String, SagaError> {
        self.currency
            .clone()
            .ok_or(SagaError::MissingState("currency"))
    }

    pub(crate) fn require_invoice_id(&self) -> Result<InvoiceId, SagaError> {
        self.invoice_id.ok_or(SagaError::MissingState("invoice_id"))
    }
}
