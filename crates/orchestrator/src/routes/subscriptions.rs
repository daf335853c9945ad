//! Subscription plan change endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use saga::{UpgradeSubscriptionRequest, UpgradeSubscriptionResponse};

use crate::error::{ApiError, ValidationError};
use crate::routes::AppState;

fn validate(request: &UpgradeSubscriptionRequest) -> Result<(), ValidationError> {
    if request.subscription_id.get() <= 0 {
        return Err(ValidationError::Required {
            field: "subscription_id",
        });
    }
    if !request.new_plan_id.is_valid() {
        return Err(ValidationError::Required {
            field: "new_plan_id",
        });
    }
    if request.tenant_id.is_some_and(|t| t.get() <= 0) {
        return Err(ValidationError::Invalid {
            field: "tenant_id",
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

/// POST /subscriptions/upgrade — runs the change plan saga.
pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpgradeSubscriptionRequest>, JsonRejection>,
) -> Result<Json<UpgradeSubscriptionResponse>, ApiError> {
    let Json(request) = payload?;
    validate(&request)?;
    let ctx = state.saga_context();

    tracing::info!(
        saga_id = %ctx.saga_id(),
        subscription_id = %request.subscription_id,
        new_plan_id = %request.new_plan_id,
        "plan change requested"
    );

    let result = state.orchestrator.upgrade_subscription(&ctx, request).await;

    let outcome = if result.is_ok() { "success" } else { "failure" };
    metrics::counter!("plan_changes_total", "outcome" => outcome).increment(1);

    Ok(Json(result?))
}
