//! Identity service trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use common::{PlanId, TenantId, UserId};
use serde::{Deserialize, Serialize};

use crate::context::SagaContext;
use crate::error::SagaError;
use crate::services::call_log::CallLog;

/// Gender as encoded by the identity service (0 male, 1 female, 2 other).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl TryFrom<i32> for Gender {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Gender::Male),
            1 => Ok(Gender::Female),
            2 => Ok(Gender::Other),
            other => Err(format!("invalid gender code {other}, expected 0, 1 or 2")),
        }
    }
}

impl From<Gender> for i32 {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => 0,
            Gender::Female => 1,
            Gender::Other => 2,
        }
    }
}

/// Profile of a user to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    /// Birthday as `YYYY-MM-DD`.
    pub birthday: String,
}

/// Identifiers assigned to a newly created user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedUser {
    pub user_id: UserId,
    pub tenant_id: TenantId,
}

/// Operations of the identity service used by the sagas.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Creates a user together with its tenant.
    async fn create_user(&self, ctx: &SagaContext, user: NewUser)
    -> Result<CreatedUser, SagaError>;

    /// Deletes a user.
    async fn delete_user(&self, ctx: &SagaContext, user_id: UserId) -> Result<(), SagaError>;

    /// Records the plan a tenant is on.
    async fn update_tenant_plan(
        &self,
        ctx: &SagaContext,
        tenant_id: TenantId,
        plan_id: PlanId,
    ) -> Result<(), SagaError>;
}

#[derive(Debug)]
struct StoredUser {
    username: String,
    tenant_id: TenantId,
}

#[derive(Debug)]
struct InMemoryIdentityState {
    users: HashMap<UserId, StoredUser>,
    tenant_plans: HashMap<TenantId, PlanId>,
    next_user_id: i64,
    next_tenant_id: i64,
    failing: HashSet<&'static str>,
    calls: CallLog,
}

impl Default for InMemoryIdentityState {
    fn default() -> Self {
        Self {
            users: HashMap::new(),
            tenant_plans: HashMap::new(),
            next_user_id: 1,
            next_tenant_id: 1,
            failing: HashSet::new(),
            calls: CallLog::new(),
        }
    }
}

/// In-memory identity service.
///
/// Every new user gets its own tenant, starting on plan 1.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityService {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityService {
    /// Creates a new in-memory identity service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service recording its calls into `calls`.
    pub fn with_call_log(calls: CallLog) -> Self {
        let service = Self::new();
        service.write().calls = calls;
        service
    }

    /// Makes every subsequent call to `operation` fail
    /// (`create_user`, `delete_user` or `update_tenant_plan`).
    pub fn fail_on(&self, operation: &'static str) {
        self.write().failing.insert(operation);
    }

    /// Sets the ID the next created user receives.
    pub fn set_next_user_id(&self, id: i64) {
        self.write().next_user_id = id;
    }

    /// Sets the ID the next created tenant receives.
    pub fn set_next_tenant_id(&self, id: i64) {
        self.write().next_tenant_id = id;
    }

    /// Registers an existing tenant on the given plan.
    pub fn insert_tenant(&self, tenant_id: TenantId, plan_id: PlanId) {
        self.write().tenant_plans.insert(tenant_id, plan_id);
    }

    /// Returns the number of users.
    pub fn user_count(&self) -> usize {
        self.read(|state| state.users.len())
    }

    /// Returns true if a user exists with the given ID.
    pub fn has_user(&self, user_id: UserId) -> bool {
        self.read(|state| state.users.contains_key(&user_id))
    }

    /// Returns the tenant a user belongs to.
    pub fn tenant_of(&self, user_id: UserId) -> Option<TenantId> {
        self.read(|state| state.users.get(&user_id).map(|user| user.tenant_id))
    }

    /// Returns the plan recorded for a tenant.
    pub fn tenant_plan(&self, tenant_id: TenantId) -> Option<PlanId> {
        self.read(|state| state.tenant_plans.get(&tenant_id).copied())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryIdentityState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, f: impl FnOnce(&InMemoryIdentityState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Checks cancellation, records the call and applies failure injection.
    fn begin(
        &self,
        ctx: &SagaContext,
        operation: &'static str,
        args: impl std::fmt::Display,
    ) -> Result<RwLockWriteGuard<'_, InMemoryIdentityState>, SagaError> {
        if ctx.is_cancelled() {
            return Err(SagaError::Cancelled);
        }
        let state = self.write();
        state.calls.record(format!("identity.{operation}:{args}"));
        if state.failing.contains(operation) {
            return Err(SagaError::Identity(format!("{operation} unavailable")));
        }
        Ok(state)
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn create_user(
        &self,
        ctx: &SagaContext,
        user: NewUser,
    ) -> Result<CreatedUser, SagaError> {
        let mut state = self.begin(ctx, "create_user", &user.username)?;

        if state.users.values().any(|u| u.username == user.username) {
            return Err(SagaError::Identity(format!(
                "username {} already taken",
                user.username
            )));
        }

        let user_id = UserId::new(state.next_user_id);
        let tenant_id = TenantId::new(state.next_tenant_id);
        state.next_user_id += 1;
        state.next_tenant_id += 1;

        state.users.insert(
            user_id,
            StoredUser {
                username: user.username,
                tenant_id,
            },
        );
        state.tenant_plans.insert(tenant_id, PlanId::new(1));

        Ok(CreatedUser { user_id, tenant_id })
    }

    async fn delete_user(&self, ctx: &SagaContext, user_id: UserId) -> Result<(), SagaError> {
        let mut state = self.begin(ctx, "delete_user", user_id)?;

        let user = state.users.remove(&user_id).ok_or(SagaError::NotFound {
            resource: "user",
            id: user_id.get(),
        })?;
        state.tenant_plans.remove(&user.tenant_id);
        Ok(())
    }

    async fn update_tenant_plan(
        &self,
        ctx: &SagaContext,
        tenant_id: TenantId,
        plan_id: PlanId,
    ) -> Result<(), SagaError> {
        let mut state = self.begin(
            ctx,
            "update_tenant_plan",
            format!("{tenant_id},{plan_id}"),
        )?;

        let plan = state
            .tenant_plans
            .get_mut(&tenant_id)
            .ok_or(SagaError::NotFound {
                resource: "tenant",
                id: tenant_id.get(),
            })?;
        *plan = plan_id;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: "correct-horse".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            gender: Gender::Female,
            birthday: "1990-05-04".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_delete_user() {
        let service = InMemoryIdentityService::new();
        let ctx = SagaContext::new();

        let created = service.create_user(&ctx, new_user("alice")).await.unwrap();
        assert_eq!(created.user_id, UserId::new(1));
        assert_eq!(created.tenant_id, TenantId::new(1));
        assert!(service.has_user(created.user_id));
        assert_eq!(service.tenant_plan(created.tenant_id), Some(PlanId::new(1)));

        service.delete_user(&ctx, created.user_id).await.unwrap();
        assert_eq!(service.user_count(), 0);
        assert_eq!(service.tenant_plan(created.tenant_id), None);
    }

    #[tokio::test]
    async fn test_seeded_ids() {
        let service = InMemoryIdentityService::new();
        service.set_next_user_id(42);
        service.set_next_tenant_id(7);

        let created = service
            .create_user(&SagaContext::new(), new_user("alice"))
            .await
            .unwrap();
        assert_eq!(created.user_id, UserId::new(42));
        assert_eq!(created.tenant_id, TenantId::new(7));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let service = InMemoryIdentityService::new();
        let ctx = SagaContext::new();

        service.create_user(&ctx, new_user("alice")).await.unwrap();
        let result = service.create_user(&ctx, new_user("alice")).await;

        assert!(matches!(result, Err(SagaError::Identity(_))));
        assert_eq!(service.user_count(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_tenant() {
        let service = InMemoryIdentityService::new();
        let result = service
            .update_tenant_plan(&SagaContext::new(), TenantId::new(9), PlanId::new(2))
            .await;
        assert!(matches!(
            result,
            Err(SagaError::NotFound {
                resource: "tenant",
                id: 9
            })
        ));
    }

    #[tokio::test]
    async fn test_fail_on_and_call_log() {
        let calls = CallLog::new();
        let service = InMemoryIdentityService::with_call_log(calls.clone());
        service.fail_on("create_user");

        let result = service
            .create_user(&SagaContext::new(), new_user("bob"))
            .await;

        assert!(matches!(result, Err(SagaError::Identity(_))));
        assert_eq!(calls.calls(), vec!["identity.create_user:bob"]);
        assert_eq!(service.user_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_context_fails_without_recording() {
        let calls = CallLog::new();
        let service = InMemoryIdentityService::with_call_log(calls.clone());
        let ctx = SagaContext::new();
        ctx.cancel();

        let result = service.create_user(&ctx, new_user("carol")).await;

        assert!(matches!(result, Err(SagaError::Cancelled)));
        assert!(calls.calls().is_empty());
    }

    #[test]
    fn test_gender_codes() {
        assert_eq!(Gender::try_from(1), Ok(Gender::Female));
        assert!(Gender::try_from(3).is_err());
        assert_eq!(i32::from(Gender::Other), 2);
    }
}
