//! Subscription plan change saga.
//!
//! Reads the current subscription and the target plan, invoices the plan
//! price, charges it, and only then switches the subscription and the
//! tenant record to the new plan. Any failure rolls back what already
//! happened and is returned to the caller unchanged.

mod state;
mod steps;

use std::sync::Arc;

use common::{InvoiceId, PlanId, SubscriptionId, TenantId};
use serde::{Deserialize, Serialize};

use crate::context::SagaContext;
use crate::coordinator::SagaCoordinator;
use crate::error::SagaError;
use crate::journal::SagaJournal;
use crate::services::{BillingService, IdentityService, PaymentService};
use crate::step::SagaStep;

pub use state::ChangePlanState;
pub use steps::{
    ApplyNewPlanStep, CreateInvoiceStep, GetPlanStep, GetSubscriptionStep, MarkInvoicePaidStep,
    ProcessPaymentStep, UpdateTenantPlanStep,
};

/// The saga type identifier for plan changes.
pub const SAGA_TYPE: &str = "ChangePlan";

pub const STEP_GET_SUBSCRIPTION: &str = "GetSubscription";
pub const STEP_GET_PLAN: &str = "GetPlan";
pub const STEP_CREATE_INVOICE: &str = "CreateInvoice";
pub const STEP_PROCESS_PAYMENT: &str = "ProcessPayment";
pub const STEP_MARK_INVOICE_PAID: &str = "MarkInvoicePaid";
pub const STEP_APPLY_NEW_PLAN: &str = "ApplyNewPlan";
pub const STEP_UPDATE_TENANT_PLAN: &str = "UpdateTenantPlan";

/// Inbound request to move a subscription to another plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeSubscriptionRequest {
    /// Tenant owning the subscription; looked up from billing when absent.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    pub subscription_id: SubscriptionId,
    pub new_plan_id: PlanId,
}

/// Result of a successful plan change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeSubscriptionResponse {
    pub invoice_id: InvoiceId,
}

/// Builds and runs plan change sagas.
#[derive(Clone)]
pub struct ChangePlanSaga {
    billing: Arc<dyn BillingService>,
    payment: Arc<dyn PaymentService>,
    identity: Arc<dyn IdentityService>,
}

impl ChangePlanSaga {
    pub fn new(
        billing: Arc<dyn BillingService>,
        payment: Arc<dyn PaymentService>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        Self {
            billing,
            payment,
            identity,
        }
    }

    /// Returns the ordered steps of the saga.
    pub fn build_steps(&self) -> Vec<Box<dyn SagaStep<ChangePlanState>>> {
        vec![
            Box::new(GetSubscriptionStep::new(self.billing.clone())),
            Box::new(GetPlanStep::new(self.billing.clone())),
            Box::new(CreateInvoiceStep::new(self.billing.clone())),
            Box::new(ProcessPaymentStep::new(self.payment.clone())),
            Box::new(MarkInvoicePaidStep::new(self.billing.clone())),
            Box::new(ApplyNewPlanStep::new(self.billing.clone())),
            Box::new(UpdateTenantPlanStep::new(self.identity.clone())),
        ]
    }

    /// Runs the saga, returning the invoice created for the change.
    pub async fn execute(
        &self,
        ctx: &SagaContext,
        request: UpgradeSubscriptionRequest,
    ) -> Result<UpgradeSubscriptionResponse, SagaError> {
        self.execute_with_journal(ctx, request).await.0
    }

    /// Runs the saga and returns the result together with the run journal.
    #[tracing::instrument(
        skip_all,
        fields(subscription_id = %request.subscription_id, new_plan_id = %request.new_plan_id)
    )]
    pub async fn execute_with_journal(
        &self,
        ctx: &SagaContext,
        request: UpgradeSubscriptionRequest,
    ) -> (Result<UpgradeSubscriptionResponse, SagaError>, SagaJournal) {
        let mut state =
            ChangePlanState::new(request.tenant_id, request.subscription_id, request.new_plan_id);
        let mut coordinator = SagaCoordinator::from_steps(SAGA_TYPE, self.build_steps());

        let result = match coordinator.execute(ctx, &mut state).await {
            Ok(()) => state
                .require_invoice_id()
                .map(|invoice_id| UpgradeSubscriptionResponse { invoice_id }),
            Err(err) => Err(err),
        };

        (result, coordinator.journal().clone())
    }
}
