use std::sync::Arc;

use async_trait::async_trait;
use common::PlanId;

use super::{RegistrationState, STEP_CREATE_SUBSCRIPTION, STEP_CREATE_USER};
use crate::context::SagaContext;
use crate::error::SagaError;
use crate::services::{BillingService, IdentityService};
use crate::step::SagaStep;

/// Creates the user and its tenant.
pub struct CreateUserStep {
    identity: Arc<dyn IdentityService>,
}

impl CreateUserStep {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl SagaStep<RegistrationState> for CreateUserStep {
    fn name(&self) -> &'static str {
        STEP_CREATE_USER
    }

    async fn execute(
        &self,
        ctx: &SagaContext,
        state: &mut RegistrationState,
    ) -> Result<(), SagaError> {
        let created = self.identity.create_user(ctx, state.user.clone()).await?;
        state.user_id = Some(created.user_id);
        state.tenant_id = Some(created.tenant_id);
        Ok(())
    }

    async fn compensate(
        &self,
        ctx: &SagaContext,
        state: &mut RegistrationState,
    ) -> Result<(), SagaError> {
        match state.user_id {
            Some(user_id) => self.identity.delete_user(ctx, user_id).await,
            None => Ok(()),
        }
    }
}

/// Subscribes the new user to the registration plan.
pub struct CreateSubscriptionStep {
    billing: Arc<dyn BillingService>,
    plan_id: PlanId,
}

impl CreateSubscriptionStep {
    pub fn new(billing: Arc<dyn BillingService>, plan_id: PlanId) -> Self {
        Self { billing, plan_id }
    }
}

#[async_trait]
impl SagaStep<RegistrationState> for CreateSubscriptionStep {
    fn name(&self) -> &'static str {
        STEP_CREATE_SUBSCRIPTION
    }

    async fn execute(
        &self,
        ctx: &SagaContext,
        state: &mut RegistrationState,
    ) -> Result<(), SagaError> {
        let user_id = state.user_id.ok_or(SagaError::MissingState("user_id"))?;
        let subscription_id = self
            .billing
            .create_subscription(ctx, user_id, self.plan_id)
            .await?;
        state.subscription_id = Some(subscription_id);
        Ok(())
    }

    async fn compensate(
        &self,
        ctx: &SagaContext,
        state: &mut RegistrationState,
    ) -> Result<(), SagaError> {
        match state.subscription_id {
            Some(subscription_id) => {
                self.billing
                    .cancel_subscription(ctx, subscription_id)
                    .await
            }
            None => Ok(()),
        }
    }
}
