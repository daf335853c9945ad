//! Registration endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use chrono::NaiveDate;
use saga::{Gender, RegisterRequest, RegisterResponse};
use serde::Deserialize;

use crate::error::{ApiError, ValidationError};
use crate::routes::AppState;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;
const NAME_MAX: usize = 100;

/// Raw registration body, validated before a saga is started.
#[derive(Deserialize)]
pub struct RegisterBody {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: i32,
    pub birthday: String,
}

impl RegisterBody {
    pub fn validate(self) -> Result<RegisterRequest, ValidationError> {
        let username = self.username.trim().to_string();
        check_length("username", &username, USERNAME_MIN, USERNAME_MAX)?;
        if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::NotAlphanumeric { field: "username" });
        }

        check_length("password", &self.password, PASSWORD_MIN, PASSWORD_MAX)?;

        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        check_length("first_name", &first_name, 1, NAME_MAX)?;
        check_length("last_name", &last_name, 1, NAME_MAX)?;

        let gender = Gender::try_from(self.gender).map_err(|reason| ValidationError::Invalid {
            field: "gender",
            reason,
        })?;

        let birthday = self.birthday.trim().to_string();
        if birthday.is_empty() {
            return Err(ValidationError::Required { field: "birthday" });
        }
        NaiveDate::parse_from_str(&birthday, "%Y-%m-%d").map_err(|e| {
            ValidationError::Invalid {
                field: "birthday",
                reason: format!("expected YYYY-MM-DD ({e})"),
            }
        })?;

        Ok(RegisterRequest {
            username,
            password: self.password,
            first_name,
            last_name,
            gender,
            birthday,
        })
    }
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::Required { field });
    }
    if len < min || len > max {
        return Err(ValidationError::Length { field, min, max });
    }
    Ok(())
}

/// POST /auth/register — runs the registration saga.
///
/// Saga failures are reported in the body with `success: false`; only
/// malformed input produces an error status.
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(body) = payload?;
    let request = body.validate()?;
    let ctx = state.saga_context();

    tracing::info!(
        saga_id = %ctx.saga_id(),
        username = %request.username,
        "registration requested"
    );

    let response = state.orchestrator.register_user(&ctx, request).await;

    let outcome = if response.success { "success" } else { "failure" };
    metrics::counter!("registrations_total", "outcome" => outcome).increment(1);

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> RegisterBody {
        RegisterBody {
            username: "alice".to_string(),
            password: "hunter22".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            gender: 1,
            birthday: "1990-01-01".to_string(),
        }
    }

    #[test]
    fn test_valid_body() {
        let request = body().validate().unwrap();
        assert_eq!(request.username, "alice");
        assert_eq!(request.gender, Gender::Female);
    }

    #[test]
    fn test_username_rules() {
        let mut short = body();
        short.username = "al".to_string();
        assert_eq!(
            short.validate().unwrap_err(),
            ValidationError::Length {
                field: "username",
                min: 3,
                max: 50
            }
        );

        let mut symbols = body();
        symbols.username = "alice!".to_string();
        assert_eq!(
            symbols.validate().unwrap_err(),
            ValidationError::NotAlphanumeric { field: "username" }
        );

        let mut blank = body();
        blank.username = "   ".to_string();
        assert_eq!(
            blank.validate().unwrap_err(),
            ValidationError::Required { field: "username" }
        );
    }

    #[test]
    fn test_short_password() {
        let mut b = body();
        b.password = "short".to_string();
        assert!(matches!(
            b.validate(),
            Err(ValidationError::Length {
                field: "password",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_gender() {
        let mut b = body();
        b.gender = 3;
        assert!(matches!(
            b.validate(),
            Err(ValidationError::Invalid { field: "gender", .. })
        ));
    }

    #[test]
    fn test_invalid_birthday() {
        let mut b = body();
        b.birthday = "1990-13-01".to_string();
        assert!(matches!(
            b.validate(),
            Err(ValidationError::Invalid {
                field: "birthday",
                ..
            })
        ));

        let mut b = body();
        b.birthday = "01/01/1990".to_string();
        assert!(b.validate().is_err());
    }
}
