//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::SagaError;
use thiserror::Error;

/// A request body that failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be between {min} and {max} characters")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
    },

    #[error("{field} must contain only letters and digits")]
    NotAlphanumeric { field: &'static str },

    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Saga execution error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    let status = match &err {
        SagaError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
        SagaError::NotFound { .. } => StatusCode::NOT_FOUND,
        SagaError::AlreadyStarted => StatusCode::CONFLICT,
        SagaError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        SagaError::MissingState(_) => {
            tracing::error!(error = %err, "saga ran with incomplete state");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        SagaError::TenantPlanUpdate(inner) => match inner.as_ref() {
            SagaError::NotFound { .. } => StatusCode::NOT_FOUND,
            SagaError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        },
        SagaError::Identity(_) | SagaError::Billing(_) | SagaError::Payment(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    (status, err.to_string())
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: SagaError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_saga_error_statuses() {
        assert_eq!(
            status_of(SagaError::PaymentDeclined {
                status: "failed".to_string(),
                message: "declined".to_string(),
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(SagaError::NotFound {
                resource: "subscription",
                id: 1
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(SagaError::Cancelled), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(SagaError::Billing("down".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(SagaError::TenantPlanUpdate(Box::new(SagaError::Identity(
                "down".to_string()
            )))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_validation_error_is_bad_request() {
        let response = ApiError::from(ValidationError::Required { field: "username" }).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
