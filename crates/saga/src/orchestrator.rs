//! Entry point used by the inbound transports.

use std::sync::Arc;

use common::PlanId;

use crate::change_plan::{ChangePlanSaga, UpgradeSubscriptionRequest, UpgradeSubscriptionResponse};
use crate::context::SagaContext;
use crate::error::SagaError;
use crate::registration::{DEFAULT_PLAN_ID, RegisterRequest, RegisterResponse, RegistrationSaga};
use crate::services::{BillingService, IdentityService, PaymentService};

/// Runs registration and plan change sagas against the three collaborators.
///
/// Every call builds fresh saga state and a fresh coordinator; nothing is
/// shared between concurrent runs except the collaborator handles.
#[derive(Clone)]
pub struct OrchestratorService {
    identity: Arc<dyn IdentityService>,
    billing: Arc<dyn BillingService>,
    payment: Arc<dyn PaymentService>,
    default_plan_id: PlanId,
}

impl OrchestratorService {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        billing: Arc<dyn BillingService>,
        payment: Arc<dyn PaymentService>,
    ) -> Self {
        Self {
            identity,
            billing,
            payment,
            default_plan_id: DEFAULT_PLAN_ID,
        }
    }

    /// Overrides the plan new users are subscribed to.
    pub fn with_default_plan(mut self, plan_id: PlanId) -> Self {
        self.default_plan_id = plan_id;
        self
    }

    /// Registers a user. Failures are reported in the response body.
    pub async fn register_user(
        &self,
        ctx: &SagaContext,
        request: RegisterRequest,
    ) -> RegisterResponse {
        RegistrationSaga::new(self.identity.clone(), self.billing.clone())
            .with_plan(self.default_plan_id)
            .execute(ctx, request)
            .await
    }

    /// Moves a subscription to a new plan, charging for it.
    pub async fn upgrade_subscription(
        &self,
        ctx: &SagaContext,
        request: UpgradeSubscriptionRequest,
    ) -> Result<UpgradeSubscriptionResponse, SagaError> {
        ChangePlanSaga::new(
            self.billing.clone(),
            self.payment.clone(),
            self.identity.clone(),
        )
        .execute(ctx, request)
        .await
    }
}
