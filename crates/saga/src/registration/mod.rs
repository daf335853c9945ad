//! User registration saga: create the user, then its default subscription.
//!
//! Failures never surface as errors to the caller. The coordinator's error is
//! folded into a [`RegisterResponse`] with `success == false`, so the HTTP
//! layer always answers with a success-shaped status and the body carries
//! the outcome.

mod steps;

use std::sync::Arc;

use common::{PlanId, SubscriptionId, TenantId, UserId};
use serde::{Deserialize, Serialize};

use crate::context::SagaContext;
use crate::coordinator::SagaCoordinator;
use crate::journal::SagaJournal;
use crate::services::{BillingService, Gender, IdentityService, NewUser};
use crate::step::SagaStep;

pub use steps::{CreateSubscriptionStep, CreateUserStep};

/// The saga type identifier for registration.
pub const SAGA_TYPE: &str = "Registration";

/// Step name: create the user in the identity service.
pub const STEP_CREATE_USER: &str = "CreateUser";

/// Step name: create the default subscription in billing.
pub const STEP_CREATE_SUBSCRIPTION: &str = "CreateSubscription";

/// Plan every new user starts on (the free tier).
pub const DEFAULT_PLAN_ID: PlanId = PlanId::new(1);

/// Inbound registration request.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    /// Birthday as `YYYY-MM-DD`.
    pub birthday: String,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("gender", &self.gender)
            .field("birthday", &self.birthday)
            .finish()
    }
}

/// Outcome of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Option<UserId>,
    pub tenant_id: Option<TenantId>,
    pub subscription_id: Option<SubscriptionId>,
    pub success: bool,
    pub message: String,
}

/// State of one registration run.
#[derive(Clone)]
pub struct RegistrationState {
    pub user: NewUser,
    pub user_id: Option<UserId>,
    pub tenant_id: Option<TenantId>,
    pub subscription_id: Option<SubscriptionId>,
}

impl From<RegisterRequest> for RegistrationState {
    fn from(req: RegisterRequest) -> Self {
        Self {
            user: NewUser {
                username: req.username,
                password: req.password,
                first_name: req.first_name,
                last_name: req.last_name,
                gender: req.gender,
                birthday: req.birthday,
            },
            user_id: None,
            tenant_id: None,
            subscription_id: None,
        }
    }
}

impl std::fmt::Debug for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationState")
            .field("username", &self.user.username)
            .field("user_id", &self.user_id)
            .field("tenant_id", &self.tenant_id)
            .field("subscription_id", &self.subscription_id)
            .finish_non_exhaustive()
    }
}

/// Builds and runs registration sagas.
#[derive(Clone)]
pub struct RegistrationSaga {
    identity: Arc<dyn IdentityService>,
    billing: Arc<dyn BillingService>,
    plan_id: PlanId,
}

impl RegistrationSaga {
    /// Creates a registration saga subscribing new users to [`DEFAULT_PLAN_ID`].
    pub fn new(identity: Arc<dyn IdentityService>, billing: Arc<dyn BillingService>) -> Self {
        Self {
            identity,
            billing,
            plan_id: DEFAULT_PLAN_ID,
        }
    }

    /// Subscribes new users to `plan_id` instead of the default plan.
    pub fn with_plan(mut self, plan_id: PlanId) -> Self {
        self.plan_id = plan_id;
        self
    }

    /// Returns the ordered steps of the saga.
    pub fn build_steps(&self) -> Vec<Box<dyn SagaStep<RegistrationState>>> {
        vec![
            Box::new(CreateUserStep::new(self.identity.clone())),
            Box::new(CreateSubscriptionStep::new(
                self.billing.clone(),
                self.plan_id,
            )),
        ]
    }

    /// Runs the saga and reports the outcome.
    pub async fn execute(&self, ctx: &SagaContext, request: RegisterRequest) -> RegisterResponse {
        self.execute_with_journal(ctx, request).await.0
    }

    /// Runs the saga and returns the outcome together with the run journal.
    #[tracing::instrument(skip_all, fields(username = %request.username))]
    pub async fn execute_with_journal(
        &self,
        ctx: &SagaContext,
        request: RegisterRequest,
    ) -> (RegisterResponse, SagaJournal) {
        let mut state = RegistrationState::from(request);
        let mut coordinator = SagaCoordinator::from_steps(SAGA_TYPE, self.build_steps());

        let response = match coordinator.execute(ctx, &mut state).await {
            Ok(()) => RegisterResponse {
                user_id: state.user_id,
                tenant_id: state.tenant_id,
                subscription_id: state.subscription_id,
                success: true,
                message: "User registered successfully".to_string(),
            },
            Err(err) => RegisterResponse {
                user_id: None,
                tenant_id: None,
                subscription_id: None,
                success: false,
                message: err.to_string(),
            },
        };

        (response, coordinator.journal().clone())
    }
}
