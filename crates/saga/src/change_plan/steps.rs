use std::sync::Arc;

use async_trait::async_trait;

use super::state::ChangePlanState;
use super::{
    STEP_APPLY_NEW_PLAN, STEP_CREATE_INVOICE, STEP_GET_PLAN, STEP_GET_SUBSCRIPTION,
    STEP_MARK_INVOICE_PAID, STEP_PROCESS_PAYMENT, STEP_UPDATE_TENANT_PLAN,
};
use crate::context::SagaContext;
use crate::error::SagaError;
use crate::services::{
    BillingService, DEFAULT_CURRENCY, IdentityService, InvoiceStatus, InvoiceUpdate, NewInvoice,
    PaymentRequest, PaymentService,
};
use crate::step::SagaStep;

/// Reads the current subscription. Read-only.
pub struct GetSubscriptionStep {
    billing: Arc<dyn BillingService>,
}

impl GetSubscriptionStep {
    pub fn new(billing: Arc<dyn BillingService>) -> Self {
        Self { billing }
    }
}

#[async_trait]
impl SagaStep<ChangePlanState> for GetSubscriptionStep {
    fn name(&self) -> &'static str {
        STEP_GET_SUBSCRIPTION
    }

    async fn execute(&self, ctx: &SagaContext, state: &mut ChangePlanState) -> Result<(), SagaError> {
        let subscription = self
            .billing
            .get_subscription(ctx, state.subscription_id)
            .await?;

        state.old_plan_id = Some(subscription.plan_id);
        if state.tenant_id.is_none() {
            state.tenant_id = subscription.tenant_id;
        }
        Ok(())
    }
}

/// Reads the target plan's price. Read-only.
pub struct GetPlanStep {
    billing: Arc<dyn BillingService>,
}

impl GetPlanStep {
    pub fn new(billing: Arc<dyn BillingService>) -> Self {
        Self { billing }
    }
}

#[async_trait]
impl SagaStep<ChangePlanState> for GetPlanStep {
    fn name(&self) -> &'static str {
        STEP_GET_PLAN
    }

    async fn execute(&self, ctx: &SagaContext, state: &mut ChangePlanState) -> Result<(), SagaError> {
        let plan = self.billing.get_plan(ctx, state.new_plan_id).await?;
        state.plan_price = Some(plan.base_price);
        state.currency = Some(DEFAULT_CURRENCY.to_string());
        Ok(())
    }
}

/// Creates a pending invoice for the plan price.
///
/// Compensation cancels the invoice.
pub struct CreateInvoiceStep {
    billing: Arc<dyn BillingService>,
}

impl CreateInvoiceStep {
    pub fn new(billing: Arc<dyn BillingService>) -> Self {
        Self { billing }
    }
}

#[async_trait]
impl SagaStep<ChangePlanState> for CreateInvoiceStep {
    fn name(&self) -> &'static str {
        STEP_CREATE_INVOICE
    }

    async fn execute(&self, ctx: &SagaContext, state: &mut ChangePlanState) -> Result<(), SagaError> {
        let invoice = NewInvoice {
            subscription_id: state.subscription_id,
            tenant_id: state.require_tenant_id()?,
            amount: state.require_plan_price()?,
            currency: state.require_currency()?,
            status: InvoiceStatus::Pending,
        };

        let invoice = self.billing.create_invoice(ctx, invoice).await?;
        state.invoice_id = Some(invoice.id);
        Ok(())
    }

    async fn compensate(
        &self,
        ctx: &SagaContext,
        state: &mut ChangePlanState,
    ) -> Result<(), SagaError> {
        let Some(invoice_id) = state.invoice_id else {
            return Ok(());
        };
        self.billing
            .update_invoice(ctx, invoice_id, InvoiceUpdate::status(InvoiceStatus::Cancelled))
            .await
    }
}

/// Charges the invoice.
///
/// A charge the payment service answers with anything but the success
/// status fails the step, so the invoice gets cancelled like on any other
/// error. Refunds are not issued automatically: compensation only reports
/// that a captured payment needs one.
pub struct ProcessPaymentStep {
    payment: Arc<dyn PaymentService>,
}

impl ProcessPaymentStep {
    pub fn new(payment: Arc<dyn PaymentService>) -> Self {
        Self { payment }
    }
}

#[async_trait]
impl SagaStep<ChangePlanState> for ProcessPaymentStep {
    fn name(&self) -> &'static str {
        STEP_PROCESS_PAYMENT
    }

    async fn execute(&self, ctx: &SagaContext, state: &mut ChangePlanState) -> Result<(), SagaError> {
        let request = PaymentRequest {
            invoice_id: state.require_invoice_id()?,
            tenant_id: state.require_tenant_id()?,
            amount: state.require_plan_price()?,
            currency: state.require_currency()?,
        };

        let outcome = self.payment.process_payment(ctx, request).await?;
        if !outcome.is_success() {
            return Err(SagaError::PaymentDeclined {
                status: outcome.status,
                message: outcome.error_message.unwrap_or_default(),
            });
        }

        state.payment_id = outcome.payment_id;
        state.payment_status = Some(outcome.status);
        Ok(())
    }

    async fn compensate(
        &self,
        _ctx: &SagaContext,
        state: &mut ChangePlanState,
    ) -> Result<(), SagaError> {
        if let Some(payment_id) = state.payment_id {
            tracing::warn!(
                %payment_id,
                invoice_id = ?state.invoice_id,
                tenant_id = ?state.tenant_id,
                "payment captured but plan change rolled back, refund required"
            );
        }
        Ok(())
    }
}

/// Marks the invoice paid and stamps the payment reference.
///
/// No compensation: a paid invoice is not reverted automatically.
pub struct MarkInvoicePaidStep {
    billing: Arc<dyn BillingService>,
}

impl MarkInvoicePaidStep {
    pub fn new(billing: Arc<dyn BillingService>) -> Self {
        Self { billing }
    }
}

#[async_trait]
impl SagaStep<ChangePlanState> for MarkInvoicePaidStep {
    fn name(&self) -> &'static str {
        STEP_MARK_INVOICE_PAID
    }

    async fn execute(&self, ctx: &SagaContext, state: &mut ChangePlanState) -> Result<(), SagaError> {
        let update = InvoiceUpdate {
            status: InvoiceStatus::Paid,
            payment_id: state.payment_id.map(|id| id.to_string()),
        };
        self.billing
            .update_invoice(ctx, state.require_invoice_id()?, update)
            .await
    }
}

/// Moves the subscription to the new plan; compensation moves it back.
pub struct ApplyNewPlanStep {
    billing: Arc<dyn BillingService>,
}

impl ApplyNewPlanStep {
    pub fn new(billing: Arc<dyn BillingService>) -> Self {
        Self { billing }
    }
}

#[async_trait]
impl SagaStep<ChangePlanState> for ApplyNewPlanStep {
    fn name(&self) -> &'static str {
        STEP_APPLY_NEW_PLAN
    }

    async fn execute(&self, ctx: &SagaContext, state: &mut ChangePlanState) -> Result<(), SagaError> {
        self.billing
            .update_subscription(ctx, state.require_tenant_id()?, state.new_plan_id)
            .await
    }

    async fn compensate(
        &self,
        ctx: &SagaContext,
        state: &mut ChangePlanState,
    ) -> Result<(), SagaError> {
        let (Some(tenant_id), Some(old_plan_id)) = (state.tenant_id, state.old_plan_id) else {
            return Ok(());
        };
        self.billing
            .update_subscription(ctx, tenant_id, old_plan_id)
            .await
    }
}

/// Records the new plan on the tenant in the identity service.
pub struct UpdateTenantPlanStep {
    identity: Arc<dyn IdentityService>,
}

impl UpdateTenantPlanStep {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl SagaStep<ChangePlanState> for UpdateTenantPlanStep {
    fn name(&self) -> &'static str {
        STEP_UPDATE_TENANT_PLAN
    }

    async fn execute(&self, ctx: &SagaContext, state: &mut ChangePlanState) -> Result<(), SagaError> {
        self.identity
            .update_tenant_plan(ctx, state.require_tenant_id()?, state.new_plan_id)
            .await
            .map_err(|err| SagaError::TenantPlanUpdate(Box::new(err)))
    }

    async fn compensate(
        &self,
        ctx: &SagaContext,
        state: &mut ChangePlanState,
    ) -> Result<(), SagaError> {
        match (state.tenant_id, state.old_plan_id) {
            (Some(tenant_id), Some(old_plan_id)) if old_plan_id.is_valid() => {
                self.identity
                    .update_tenant_plan(ctx, tenant_id, old_plan_id)
                    .await
            }
            _ => Ok(()),
        }
    }
}
