//! Integration tests for the registration and plan change sagas.

use std::sync::Arc;

use async_trait::async_trait;
use common::{InvoiceId, PlanId, SubscriptionId, TenantId, UserId};
use saga::change_plan::{
    STEP_APPLY_NEW_PLAN, STEP_CREATE_INVOICE, STEP_GET_PLAN, STEP_GET_SUBSCRIPTION,
    STEP_MARK_INVOICE_PAID, STEP_PROCESS_PAYMENT,
};
use saga::registration::{STEP_CREATE_SUBSCRIPTION, STEP_CREATE_USER};
use saga::services::{CreatedUser, IdentityService, InvoiceStatus, NewUser, SubscriptionStatus};
use saga::{
    CallLog, ChangePlanSaga, Gender, InMemoryBillingService, InMemoryIdentityService,
    InMemoryPaymentService, OrchestratorService, RegisterRequest, RegistrationSaga, SagaContext,
    SagaError, SagaStatus, UpgradeSubscriptionRequest,
};

const TENANT: TenantId = TenantId::new(7);

struct TestHarness {
    calls: CallLog,
    identity: InMemoryIdentityService,
    billing: InMemoryBillingService,
    payment: InMemoryPaymentService,
}

impl TestHarness {
    fn new() -> Self {
        let calls = CallLog::new();
        let identity = InMemoryIdentityService::with_call_log(calls.clone());
        Self {
            billing: InMemoryBillingService::with_call_log(calls.clone())
                .with_identity(identity.clone()),
            payment: InMemoryPaymentService::with_call_log(calls.clone()),
            identity,
            calls,
        }
    }

    fn registration(&self) -> RegistrationSaga {
        RegistrationSaga::new(
            Arc::new(self.identity.clone()),
            Arc::new(self.billing.clone()),
        )
    }

    fn change_plan(&self) -> ChangePlanSaga {
        ChangePlanSaga::new(
            Arc::new(self.billing.clone()),
            Arc::new(self.payment.clone()),
            Arc::new(self.identity.clone()),
        )
    }

    fn orchestrator(&self) -> OrchestratorService {
        OrchestratorService::new(
            Arc::new(self.identity.clone()),
            Arc::new(self.billing.clone()),
            Arc::new(self.payment.clone()),
        )
    }

    /// Seeds tenant 7 on the free plan with an active subscription.
    fn seed_free_tenant(&self) -> SubscriptionId {
        self.identity.insert_tenant(TENANT, PlanId::new(1));
        let subscription_id = self.billing.insert_subscription(TENANT, PlanId::new(1));
        self.billing.set_next_invoice_id(67890);
        self.payment.set_next_payment_id(555);
        subscription_id
    }

    fn calls(&self) -> Vec<String> {
        self.calls.calls()
    }
}

/// Identity backend whose caller is cancelled as soon as a user exists.
struct CancelAfterCreateUser {
    inner: InMemoryIdentityService,
}

#[async_trait]
impl IdentityService for CancelAfterCreateUser {
    async fn create_user(
        &self,
        ctx: &SagaContext,
        user: NewUser,
    ) -> Result<CreatedUser, SagaError> {
        let created = self.inner.create_user(ctx, user).await?;
        ctx.cancel();
        Ok(created)
    }

    async fn delete_user(&self, ctx: &SagaContext, user_id: UserId) -> Result<(), SagaError> {
        self.inner.delete_user(ctx, user_id).await
    }

    async fn update_tenant_plan(
        &self,
        ctx: &SagaContext,
        tenant_id: TenantId,
        plan_id: PlanId,
    ) -> Result<(), SagaError> {
        self.inner.update_tenant_plan(ctx, tenant_id, plan_id).await
    }
}

fn register_request(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        password: "wonderland".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Liddell".to_string(),
        gender: Gender::Female,
        birthday: "1852-05-04".to_string(),
    }
}

fn upgrade_to_pro(subscription_id: SubscriptionId) -> UpgradeSubscriptionRequest {
    UpgradeSubscriptionRequest {
        tenant_id: Some(TENANT),
        subscription_id,
        new_plan_id: PlanId::new(2),
    }
}

// -- Registration --

#[tokio::test]
async fn test_registration_happy_path() {
    let h = TestHarness::new();
    h.identity.set_next_user_id(42);
    h.identity.set_next_tenant_id(7);
    h.billing.set_next_subscription_id(900);

    let (response, journal) = h
        .registration()
        .execute_with_journal(&SagaContext::new(), register_request("alice"))
        .await;

    assert!(response.success);
    assert_eq!(response.user_id, Some(UserId::new(42)));
    assert_eq!(response.tenant_id, Some(TenantId::new(7)));
    assert_eq!(response.subscription_id, Some(SubscriptionId::new(900)));

    assert_eq!(
        h.calls(),
        vec!["identity.create_user:alice", "billing.create_subscription:42,1"]
    );
    assert_eq!(
        h.billing.subscription_owner(SubscriptionId::new(900)),
        Some(UserId::new(42))
    );
    assert_eq!(journal.status(), SagaStatus::Succeeded);
    assert_eq!(
        journal.completed_steps(),
        &[STEP_CREATE_USER, STEP_CREATE_SUBSCRIPTION]
    );
}

#[tokio::test]
async fn test_registration_subscription_failure_deletes_user() {
    let h = TestHarness::new();
    h.identity.set_next_user_id(42);
    h.billing.fail_on("create_subscription");

    let (response, journal) = h
        .registration()
        .execute_with_journal(&SagaContext::new(), register_request("alice"))
        .await;

    assert!(!response.success);
    assert!(!response.message.is_empty());
    assert_eq!(response.user_id, None);

    assert_eq!(
        h.calls(),
        vec![
            "identity.create_user:alice",
            "billing.create_subscription:42,1",
            "identity.delete_user:42",
        ]
    );
    assert_eq!(h.calls.count_of("identity.delete_user"), 1);
    assert_eq!(h.identity.user_count(), 0);
    assert_eq!(journal.status(), SagaStatus::Failed);
    assert_eq!(journal.compensated_steps(), &[STEP_CREATE_USER]);
}

#[tokio::test]
async fn test_registration_user_failure_compensates_nothing() {
    let h = TestHarness::new();
    h.identity.fail_on("create_user");

    let response = h
        .registration()
        .execute(&SagaContext::new(), register_request("alice"))
        .await;

    assert!(!response.success);
    assert_eq!(
        response.message,
        "Identity service error: create_user unavailable"
    );
    assert_eq!(h.calls(), vec!["identity.create_user:alice"]);
    assert_eq!(h.billing.active_subscription_count(), 0);
}

#[tokio::test]
async fn test_registration_failed_compensation_still_reports_original_error() {
    let h = TestHarness::new();
    h.billing.fail_on("create_subscription");
    h.identity.fail_on("delete_user");

    let (response, journal) = h
        .registration()
        .execute_with_journal(&SagaContext::new(), register_request("alice"))
        .await;

    assert!(!response.success);
    assert_eq!(
        response.message,
        "Billing service error: create_subscription unavailable"
    );
    assert_eq!(journal.failed_compensations(), &[STEP_CREATE_USER]);
    // The user is left behind; nothing retries the compensation.
    assert_eq!(h.identity.user_count(), 1);
}

#[tokio::test]
async fn test_registration_with_cancelled_context() {
    let h = TestHarness::new();
    let ctx = SagaContext::new();
    ctx.cancel();

    let response = h.registration().execute(&ctx, register_request("alice")).await;

    assert!(!response.success);
    assert_eq!(response.message, SagaError::Cancelled.to_string());
    assert!(h.calls().is_empty());
}

#[tokio::test]
async fn test_registration_cancelled_mid_run_still_deletes_user() {
    let h = TestHarness::new();
    let identity = CancelAfterCreateUser {
        inner: h.identity.clone(),
    };
    let saga = RegistrationSaga::new(Arc::new(identity), Arc::new(h.billing.clone()));
    let ctx = SagaContext::new();

    let (response, journal) = saga
        .execute_with_journal(&ctx, register_request("alice"))
        .await;

    assert!(ctx.is_cancelled());
    assert!(!response.success);
    assert_eq!(response.message, SagaError::Cancelled.to_string());
    assert_eq!(
        h.calls(),
        vec!["identity.create_user:alice", "identity.delete_user:1"]
    );
    assert_eq!(h.identity.user_count(), 0);
    assert_eq!(h.billing.active_subscription_count(), 0);
    assert_eq!(journal.compensated_steps(), &[STEP_CREATE_USER]);
    assert!(journal.failed_compensations().is_empty());
}

#[tokio::test]
async fn test_concurrent_registrations_get_independent_state() {
    let h = TestHarness::new();
    let service = h.orchestrator();
    let ctx = SagaContext::new();

    let (alice, bob) = tokio::join!(
        service.register_user(&ctx, register_request("alice")),
        service.register_user(&ctx, register_request("bob")),
    );

    assert!(alice.success && bob.success);
    assert_ne!(alice.user_id, bob.user_id);
    assert_ne!(alice.subscription_id, bob.subscription_id);
    assert_eq!(h.billing.active_subscription_count(), 2);
}

#[tokio::test]
async fn test_orchestrator_uses_configured_default_plan() {
    let h = TestHarness::new();
    let service = h.orchestrator().with_default_plan(PlanId::new(3));

    let response = service
        .register_user(&SagaContext::new(), register_request("carol"))
        .await;

    assert!(response.success);
    assert_eq!(h.calls()[1], "billing.create_subscription:1,3");
}

// -- Change plan --

#[tokio::test]
async fn test_registered_tenant_can_upgrade() {
    let h = TestHarness::new();
    let service = h.orchestrator();
    h.billing.set_next_invoice_id(67890);

    let registered = service
        .register_user(&SagaContext::new(), register_request("alice"))
        .await;
    assert!(registered.success);
    let tenant_id = registered.tenant_id.unwrap();
    let subscription_id = registered.subscription_id.unwrap();
    assert_eq!(
        h.billing.subscription(subscription_id).unwrap().tenant_id,
        Some(tenant_id)
    );
    h.calls.clear();

    let response = service
        .upgrade_subscription(
            &SagaContext::new(),
            UpgradeSubscriptionRequest {
                tenant_id: None,
                subscription_id,
                new_plan_id: PlanId::new(2),
            },
        )
        .await
        .unwrap();

    assert_eq!(response.invoice_id, InvoiceId::new(67890));
    assert_eq!(
        h.calls(),
        vec![
            format!("billing.get_subscription:{subscription_id}"),
            "billing.get_plan:2".to_string(),
            format!("billing.create_invoice:{subscription_id}"),
            "payment.process_payment:67890".to_string(),
            "billing.update_invoice:67890,PAID".to_string(),
            format!("billing.update_subscription:{tenant_id},2"),
            format!("identity.update_tenant_plan:{tenant_id},2"),
        ]
    );
    assert_eq!(
        h.billing.subscription(subscription_id).unwrap().plan_id,
        PlanId::new(2)
    );
    assert_eq!(h.identity.tenant_plan(tenant_id), Some(PlanId::new(2)));
    assert_eq!(
        h.billing.invoice(InvoiceId::new(67890)).unwrap().status,
        InvoiceStatus::Paid
    );
}

#[tokio::test]
async fn test_change_plan_happy_path() {
    let h = TestHarness::new();
    let subscription_id = h.seed_free_tenant();

    let (result, journal) = h
        .change_plan()
        .execute_with_journal(&SagaContext::new(), upgrade_to_pro(subscription_id))
        .await;

    let response = result.unwrap();
    assert_eq!(response.invoice_id, InvoiceId::new(67890));

    assert_eq!(
        h.calls(),
        vec![
            format!("billing.get_subscription:{subscription_id}"),
            "billing.get_plan:2".to_string(),
            format!("billing.create_invoice:{subscription_id}"),
            "payment.process_payment:67890".to_string(),
            "billing.update_invoice:67890,PAID".to_string(),
            "billing.update_subscription:7,2".to_string(),
            "identity.update_tenant_plan:7,2".to_string(),
        ]
    );

    let invoice = h.billing.invoice(InvoiceId::new(67890)).unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.payment_id.as_deref(), Some("555"));
    assert_eq!(invoice.amount.cents(), 2000);
    assert_eq!(invoice.currency, "USD");

    assert_eq!(
        h.billing.subscription(subscription_id).unwrap().plan_id,
        PlanId::new(2)
    );
    assert_eq!(h.identity.tenant_plan(TENANT), Some(PlanId::new(2)));
    assert_eq!(journal.status(), SagaStatus::Succeeded);
    assert!(journal.compensated_steps().is_empty());
}

#[tokio::test]
async fn test_change_plan_payment_declined_cancels_invoice() {
    let h = TestHarness::new();
    let subscription_id = h.seed_free_tenant();
    h.payment.decline_with("insufficient funds");

    let (result, journal) = h
        .change_plan()
        .execute_with_journal(&SagaContext::new(), upgrade_to_pro(subscription_id))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, SagaError::PaymentDeclined { .. }));
    assert_eq!(err.to_string(), "Payment failed: insufficient funds");

    assert_eq!(
        h.calls(),
        vec![
            format!("billing.get_subscription:{subscription_id}"),
            "billing.get_plan:2".to_string(),
            format!("billing.create_invoice:{subscription_id}"),
            "payment.process_payment:67890".to_string(),
            "billing.update_invoice:67890,CANCELLED".to_string(),
        ]
    );
    assert_eq!(h.calls.count_of("billing.update_subscription"), 0);
    assert_eq!(h.calls.count_of("identity.update_tenant_plan"), 0);

    assert_eq!(
        h.billing.invoice(InvoiceId::new(67890)).unwrap().status,
        InvoiceStatus::Cancelled
    );
    assert_eq!(
        journal.compensated_steps(),
        &[STEP_CREATE_INVOICE, STEP_GET_PLAN, STEP_GET_SUBSCRIPTION]
    );
}

#[tokio::test]
async fn test_change_plan_tenant_update_failure_reverts_subscription() {
    let h = TestHarness::new();
    let subscription_id = h.seed_free_tenant();
    h.identity.fail_on("update_tenant_plan");

    let (result, journal) = h
        .change_plan()
        .execute_with_journal(&SagaContext::new(), upgrade_to_pro(subscription_id))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, SagaError::TenantPlanUpdate(_)));
    assert!(err.to_string().starts_with("failed to update tenant plan"));

    let calls = h.calls();
    assert_eq!(
        &calls[6..],
        &[
            "identity.update_tenant_plan:7,2",
            "billing.update_subscription:7,1",
            "billing.update_invoice:67890,CANCELLED",
        ]
    );
    assert_eq!(
        h.billing.subscription(subscription_id).unwrap().plan_id,
        PlanId::new(1)
    );
    assert_eq!(h.identity.tenant_plan(TENANT), Some(PlanId::new(1)));
    // The payment itself stays captured; refunds are manual.
    assert_eq!(h.payment.payment_count(), 1);
    assert_eq!(
        &journal.compensated_steps()[..3],
        &[STEP_APPLY_NEW_PLAN, STEP_MARK_INVOICE_PAID, STEP_PROCESS_PAYMENT]
    );
}

#[tokio::test]
async fn test_change_plan_first_step_failure_makes_no_compensation_calls() {
    let h = TestHarness::new();
    let subscription_id = h.seed_free_tenant();
    h.billing.fail_on("get_subscription");

    let result = h
        .change_plan()
        .execute(&SagaContext::new(), upgrade_to_pro(subscription_id))
        .await;

    assert!(matches!(result, Err(SagaError::Billing(_))));
    assert_eq!(
        h.calls(),
        vec![format!("billing.get_subscription:{subscription_id}")]
    );
}

#[tokio::test]
async fn test_change_plan_resolves_tenant_from_subscription() {
    let h = TestHarness::new();
    let subscription_id = h.seed_free_tenant();

    let response = h
        .change_plan()
        .execute(
            &SagaContext::new(),
            UpgradeSubscriptionRequest {
                tenant_id: None,
                ..upgrade_to_pro(subscription_id)
            },
        )
        .await
        .unwrap();

    assert_eq!(response.invoice_id, InvoiceId::new(67890));
    assert_eq!(h.identity.tenant_plan(TENANT), Some(PlanId::new(2)));
}

#[tokio::test]
async fn test_change_plan_unknown_plan_creates_no_invoice() {
    let h = TestHarness::new();
    let subscription_id = h.seed_free_tenant();

    let result = h
        .change_plan()
        .execute(
            &SagaContext::new(),
            UpgradeSubscriptionRequest {
                new_plan_id: PlanId::new(99),
                ..upgrade_to_pro(subscription_id)
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(SagaError::NotFound {
            resource: "plan",
            id: 99
        })
    ));
    assert!(h.billing.invoice(InvoiceId::new(67890)).is_none());
    assert_eq!(h.calls.count_of("billing.create_invoice"), 0);
}

#[tokio::test]
async fn test_change_plan_payment_transport_error() {
    let h = TestHarness::new();
    let subscription_id = h.seed_free_tenant();
    h.payment.fail_on("process_payment");

    let result = h
        .orchestrator()
        .upgrade_subscription(&SagaContext::new(), upgrade_to_pro(subscription_id))
        .await;

    assert!(matches!(result, Err(SagaError::Payment(_))));
    assert_eq!(
        h.billing.invoice(InvoiceId::new(67890)).unwrap().status,
        InvoiceStatus::Cancelled
    );
    assert_eq!(
        h.billing.subscription(subscription_id).unwrap().status,
        SubscriptionStatus::Active
    );
}
