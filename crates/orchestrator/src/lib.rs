//! HTTP front end for the saga orchestrator.
//!
//! Exposes tenant registration and subscription plan changes over REST,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{InMemoryBillingService, InMemoryIdentityService, InMemoryPaymentService, OrchestratorService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Handles to the in-memory collaborators backing a default state.
#[derive(Clone)]
pub struct InMemoryBackends {
    pub identity: InMemoryIdentityService,
    pub billing: InMemoryBillingService,
    pub payment: InMemoryPaymentService,
}

impl InMemoryBackends {
    /// Creates fresh collaborators, with billing resolving tenants through
    /// identity.
    pub fn new() -> Self {
        let identity = InMemoryIdentityService::new();
        Self {
            billing: InMemoryBillingService::new().with_identity(identity.clone()),
            payment: InMemoryPaymentService::new(),
            identity,
        }
    }
}

impl Default for InMemoryBackends {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/register", post(routes::auth::register))
        .route("/subscriptions/upgrade", post(routes::subscriptions::upgrade))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state wired to in-memory collaborators.
pub fn create_default_state(config: &Config) -> (Arc<AppState>, InMemoryBackends) {
    let backends = InMemoryBackends::default();

    let orchestrator = OrchestratorService::new(
        Arc::new(backends.identity.clone()),
        Arc::new(backends.billing.clone()),
        Arc::new(backends.payment.clone()),
    )
    .with_default_plan(config.default_plan_id);

    (Arc::new(AppState::new(orchestrator)), backends)
}
