//! Billing service trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use common::{InvoiceId, Money, PlanId, SubscriptionId, TenantId, UserId};
use serde::{Deserialize, Serialize};

use crate::context::SagaContext;
use crate::error::SagaError;
use crate::services::call_log::CallLog;
use crate::services::identity::InMemoryIdentityService;

/// Currency used for plan prices and invoices.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Lifecycle of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
}

/// A subscription as reported by billing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    /// Owning tenant, when billing knows it.
    pub tenant_id: Option<TenantId>,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
}

/// A billing plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub base_price: Money,
}

/// Invoice to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub subscription_id: SubscriptionId,
    pub tenant_id: TenantId,
    pub amount: Money,
    pub currency: String,
    pub status: InvoiceStatus,
}

/// A stored invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub id: InvoiceId,
    pub subscription_id: SubscriptionId,
    pub tenant_id: TenantId,
    pub amount: Money,
    pub currency: String,
    pub status: InvoiceStatus,
    /// Payment reference stamped when the invoice is paid.
    pub payment_id: Option<String>,
}

/// Change applied to an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceUpdate {
    pub status: InvoiceStatus,
    pub payment_id: Option<String>,
}

impl InvoiceUpdate {
    /// Only changes the status.
    pub fn status(status: InvoiceStatus) -> Self {
        Self {
            status,
            payment_id: None,
        }
    }
}

/// Operations of the billing service used by the sagas.
#[async_trait]
pub trait BillingService: Send + Sync {
    /// Creates a subscription for a user on a plan.
    async fn create_subscription(
        &self,
        ctx: &SagaContext,
        user_id: UserId,
        plan_id: PlanId,
    ) -> Result<SubscriptionId, SagaError>;

    /// Cancels a subscription.
    async fn cancel_subscription(
        &self,
        ctx: &SagaContext,
        subscription_id: SubscriptionId,
    ) -> Result<(), SagaError>;

    /// Loads a subscription.
    async fn get_subscription(
        &self,
        ctx: &SagaContext,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription, SagaError>;

    /// Moves the tenant's subscription to another plan.
    async fn update_subscription(
        &self,
        ctx: &SagaContext,
        tenant_id: TenantId,
        plan_id: PlanId,
    ) -> Result<(), SagaError>;

    /// Loads a plan.
    async fn get_plan(&self, ctx: &SagaContext, plan_id: PlanId) -> Result<Plan, SagaError>;

    /// Creates an invoice.
    async fn create_invoice(
        &self,
        ctx: &SagaContext,
        invoice: NewInvoice,
    ) -> Result<Invoice, SagaError>;

    /// Updates an invoice's status and payment reference.
    async fn update_invoice(
        &self,
        ctx: &SagaContext,
        invoice_id: InvoiceId,
        update: InvoiceUpdate,
    ) -> Result<(), SagaError>;
}

#[derive(Debug)]
struct StoredSubscription {
    user_id: Option<UserId>,
    tenant_id: Option<TenantId>,
    plan_id: PlanId,
    status: SubscriptionStatus,
}

#[derive(Debug)]
struct InMemoryBillingState {
    plans: HashMap<PlanId, Plan>,
    subscriptions: HashMap<SubscriptionId, StoredSubscription>,
    invoices: HashMap<InvoiceId, Invoice>,
    next_subscription_id: i64,
    next_invoice_id: i64,
    failing: HashSet<&'static str>,
    calls: CallLog,
}

impl Default for InMemoryBillingState {
    fn default() -> Self {
        let plans = [(1, "Free", 0), (2, "Pro", 20), (3, "Business", 50)]
            .into_iter()
            .map(|(id, name, dollars)| {
                let id = PlanId::new(id);
                (
                    id,
                    Plan {
                        id,
                        name: name.to_string(),
                        base_price: Money::from_dollars(dollars),
                    },
                )
            })
            .collect();

        Self {
            plans,
            subscriptions: HashMap::new(),
            invoices: HashMap::new(),
            next_subscription_id: 1,
            next_invoice_id: 1,
            failing: HashSet::new(),
            calls: CallLog::new(),
        }
    }
}

/// In-memory billing service seeded with the Free, Pro and Business plans.
///
/// Linked to an identity backend with [`with_identity`](Self::with_identity),
/// subscriptions created for a user are stored under that user's tenant.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingService {
    state: Arc<RwLock<InMemoryBillingState>>,
    identity: Option<InMemoryIdentityService>,
}

impl InMemoryBillingService {
    /// Creates a new in-memory billing service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service recording its calls into `calls`.
    pub fn with_call_log(calls: CallLog) -> Self {
        let service = Self::new();
        service.write().calls = calls;
        service
    }

    /// Resolves subscription owners to tenants through `identity`.
    pub fn with_identity(mut self, identity: InMemoryIdentityService) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Makes every subsequent call to `operation` fail, e.g. `create_invoice`.
    pub fn fail_on(&self, operation: &'static str) {
        self.write().failing.insert(operation);
    }

    /// Sets the ID the next created subscription receives.
    pub fn set_next_subscription_id(&self, id: i64) {
        self.write().next_subscription_id = id;
    }

    /// Sets the ID the next created invoice receives.
    pub fn set_next_invoice_id(&self, id: i64) {
        self.write().next_invoice_id = id;
    }

    /// Adds or replaces a plan.
    pub fn insert_plan(&self, plan: Plan) {
        self.write().plans.insert(plan.id, plan);
    }

    /// Stores an active subscription for an existing tenant and returns its ID.
    pub fn insert_subscription(&self, tenant_id: TenantId, plan_id: PlanId) -> SubscriptionId {
        let mut state = self.write();
        let id = SubscriptionId::new(state.next_subscription_id);
        state.next_subscription_id += 1;
        state.subscriptions.insert(
            id,
            StoredSubscription {
                user_id: None,
                tenant_id: Some(tenant_id),
                plan_id,
                status: SubscriptionStatus::Active,
            },
        );
        id
    }

    /// Returns a subscription's current state.
    pub fn subscription(&self, id: SubscriptionId) -> Option<Subscription> {
        self.read(|state| {
            state.subscriptions.get(&id).map(|sub| Subscription {
                id,
                tenant_id: sub.tenant_id,
                plan_id: sub.plan_id,
                status: sub.status,
            })
        })
    }

    /// Returns the user a subscription was created for.
    pub fn subscription_owner(&self, id: SubscriptionId) -> Option<UserId> {
        self.read(|state| state.subscriptions.get(&id).and_then(|sub| sub.user_id))
    }

    /// Returns the number of active subscriptions.
    pub fn active_subscription_count(&self) -> usize {
        self.read(|state| {
            state
                .subscriptions
                .values()
                .filter(|sub| sub.status == SubscriptionStatus::Active)
                .count()
        })
    }

    /// Returns a stored invoice.
    pub fn invoice(&self, id: InvoiceId) -> Option<Invoice> {
        self.read(|state| state.invoices.get(&id).cloned())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryBillingState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, f: impl FnOnce(&InMemoryBillingState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Checks cancellation, records the call and applies failure injection.
    fn begin(
        &self,
        ctx: &SagaContext,
        operation: &'static str,
        args: impl std::fmt::Display,
    ) -> Result<RwLockWriteGuard<'_, InMemoryBillingState>, SagaError> {
        if ctx.is_cancelled() {
            return Err(SagaError::Cancelled);
        }
        let state = self.write();
        state.calls.record(format!("billing.{operation}:{args}"));
        if state.failing.contains(operation) {
            return Err(SagaError::Billing(format!("{operation} unavailable")));
        }
        Ok(state)
    }
}

fn subscription_not_found(id: SubscriptionId) -> SagaError {
    SagaError::NotFound {
        resource: "subscription",
        id: id.get(),
    }
}

fn plan_not_found(id: PlanId) -> SagaError {
    SagaError::NotFound {
        resource: "plan",
        id: id.get(),
    }
}

#[async_trait]
impl BillingService for InMemoryBillingService {
    async fn create_subscription(
        &self,
        ctx: &SagaContext,
        user_id: UserId,
        plan_id: PlanId,
    ) -> Result<SubscriptionId, SagaError> {
        let tenant_id = self
            .identity
            .as_ref()
            .and_then(|identity| identity.tenant_of(user_id));
        let mut state = self.begin(ctx, "create_subscription", format!("{user_id},{plan_id}"))?;

        if !state.plans.contains_key(&plan_id) {
            return Err(plan_not_found(plan_id));
        }

        let id = SubscriptionId::new(state.next_subscription_id);
        state.next_subscription_id += 1;
        state.subscriptions.insert(
            id,
            StoredSubscription {
                user_id: Some(user_id),
                tenant_id,
                plan_id,
                status: SubscriptionStatus::Active,
            },
        );
        Ok(id)
    }

    async fn cancel_subscription(
        &self,
        ctx: &SagaContext,
        subscription_id: SubscriptionId,
    ) -> Result<(), SagaError> {
        let mut state = self.begin(ctx, "cancel_subscription", subscription_id)?;

        let sub = state
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or_else(|| subscription_not_found(subscription_id))?;
        sub.status = SubscriptionStatus::Cancelled;
        Ok(())
    }

    async fn get_subscription(
        &self,
        ctx: &SagaContext,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription, SagaError> {
        let state = self.begin(ctx, "get_subscription", subscription_id)?;

        state
            .subscriptions
            .get(&subscription_id)
            .map(|sub| Subscription {
                id: subscription_id,
                tenant_id: sub.tenant_id,
                plan_id: sub.plan_id,
                status: sub.status,
            })
            .ok_or_else(|| subscription_not_found(subscription_id))
    }

    async fn update_subscription(
        &self,
        ctx: &SagaContext,
        tenant_id: TenantId,
        plan_id: PlanId,
    ) -> Result<(), SagaError> {
        let mut state = self.begin(ctx, "update_subscription", format!("{tenant_id},{plan_id}"))?;

        if !state.plans.contains_key(&plan_id) {
            return Err(plan_not_found(plan_id));
        }

        let sub = state
            .subscriptions
            .values_mut()
            .find(|sub| {
                sub.tenant_id == Some(tenant_id) && sub.status == SubscriptionStatus::Active
            })
            .ok_or(SagaError::NotFound {
                resource: "subscription for tenant",
                id: tenant_id.get(),
            })?;
        sub.plan_id = plan_id;
        Ok(())
    }

    async fn get_plan(&self, ctx: &SagaContext, plan_id: PlanId) -> Result<Plan, SagaError> {
        let state = self.begin(ctx, "get_plan", plan_id)?;

        state
            .plans
            .get(&plan_id)
            .cloned()
            .ok_or_else(|| plan_not_found(plan_id))
    }

    async fn create_invoice(
        &self,
        ctx: &SagaContext,
        invoice: NewInvoice,
    ) -> Result<Invoice, SagaError> {
        let mut state = self.begin(ctx, "create_invoice", invoice.subscription_id)?;

        let id = InvoiceId::new(state.next_invoice_id);
        state.next_invoice_id += 1;
        let stored = Invoice {
            id,
            subscription_id: invoice.subscription_id,
            tenant_id: invoice.tenant_id,
            amount: invoice.amount,
            currency: invoice.currency,
            status: invoice.status,
            payment_id: None,
        };
        state.invoices.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_invoice(
        &self,
        ctx: &SagaContext,
        invoice_id: InvoiceId,
        update: InvoiceUpdate,
    ) -> Result<(), SagaError> {
        let mut state = self.begin(
            ctx,
            "update_invoice",
            format!("{invoice_id},{}", update.status),
        )?;

        let invoice = state
            .invoices
            .get_mut(&invoice_id)
            .ok_or(SagaError::NotFound {
                resource: "invoice",
                id: invoice_id.get(),
            })?;
        invoice.status = update.status;
        if update.payment_id.is_some() {
            invoice.payment_id = update.payment_id;
        }
        Ok(())
    }
}
