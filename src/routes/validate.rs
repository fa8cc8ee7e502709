use axum::{Json, Router, extract::Path, middleware, routing::post};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::security::json::ValidatedJson;
use crate::security::rate_limit::{RateLimiterState, TrustedProxies, enforce_rate_limit};
use crate::validation::{
    PasswordPolicy, PasswordStrength, ValidationResult, compute_strength, validate_confirm_password,
    validate_email, validate_password,
};

pub fn router(trusted: &TrustedProxies) -> Router {
    Router::new().route(
        "/validate/:field",
        post(validate_field).layer(middleware::from_fn_with_state(
            RateLimiterState::validation().trusting(trusted.clone()),
            enforce_rate_limit,
        )),
    )
}

/// The field being checked, as it appears in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Email,
    /// Account-creation password, including the uppercase rule.
    Password,
    SignInPassword,
    ConfirmPassword,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateRequest {
    value: String,
    /// The password being confirmed; only read for `confirm-password`.
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    result: ValidationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    strength: Option<PasswordStrength>,
}

/// Live feedback for a single keystroke or blur. Results are always dirty, since
/// the caller only asks once the user has interacted with the field.
#[tracing::instrument(name = "validate_field", skip(payload))]
pub async fn validate_field(
    Path(field): Path<FieldKind>,
    ValidatedJson(payload): ValidatedJson<ValidateRequest>,
) -> Result<Json<ValidateResponse>, AppError> {
    Ok(Json(evaluate(field, &payload)))
}

fn evaluate(field: FieldKind, payload: &ValidateRequest) -> ValidateResponse {
    let value = payload.value.as_str();
    match field {
        FieldKind::Email => ValidateResponse {
            result: validate_email(value),
            strength: None,
        },
        FieldKind::Password => ValidateResponse {
            result: validate_password(value, PasswordPolicy::CreateAccount),
            strength: Some(compute_strength(value)),
        },
        FieldKind::SignInPassword => ValidateResponse {
            result: validate_password(value, PasswordPolicy::SignIn),
            strength: None,
        },
        FieldKind::ConfirmPassword => {
            let password = payload.password.as_deref().unwrap_or_default();
            ValidateResponse {
                result: validate_confirm_password(value, password),
                strength: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::super::testing::{app, send};
    use super::*;

    #[tokio::test]
    async fn test_email_feedback() {
        let (app, _) = app();
        let uri = "/validate/email";

        let (status, body) = send(&app, Method::POST, uri, Some(json!({"value": "a@b.co"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["valid"], true);
        assert_eq!(body["result"]["dirty"], true);
        assert!(body.get("strength").is_none());

        let (_, body) = send(&app, Method::POST, uri, Some(json!({"value": ""}))).await;
        assert_eq!(body["result"]["message"], "Email is required");
    }

    #[tokio::test]
    async fn test_password_feedback_includes_strength() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/validate/password",
            Some(json!({"value": "abcdefg1!"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["valid"], false);
        assert_eq!(body["strength"]["score"], 3);
        assert_eq!(body["strength"]["label"], "Good");
        assert_eq!(body["strength"]["has_uppercase"], false);
    }

    #[tokio::test]
    async fn test_sign_in_password_skips_uppercase_rule() {
        let (app, _) = app();
        let (_, body) = send(
            &app,
            Method::POST,
            "/validate/sign-in-password",
            Some(json!({"value": "abcdefg1!"})),
        )
        .await;
        assert_eq!(body["result"]["valid"], true);
    }

    #[tokio::test]
    async fn test_confirm_password_compares_against_reference() {
        let (app, _) = app();
        let (_, body) = send(
            &app,
            Method::POST,
            "/validate/confirm-password",
            Some(json!({"value": "Abcdefg1!", "password": "Abcdefg1?"})),
        )
        .await;
        assert_eq!(body["result"]["message"], "Passwords do not match");

        let (_, body) = send(
            &app,
            Method::POST,
            "/validate/confirm-password",
            Some(json!({"value": "Abcdefg1!", "password": "Abcdefg1!"})),
        )
        .await;
        assert_eq!(body["result"]["valid"], true);
    }

    #[tokio::test]
    async fn test_unknown_field_is_rejected() {
        let (app, _) = app();
        let payload = Some(json!({"value": "x"}));
        let (status, _) = send(&app, Method::POST, "/validate/username", payload).await;
        assert!(status.is_client_error());
    }

    #[test]
    fn test_missing_reference_means_mismatch() {
        let response = evaluate(
            FieldKind::ConfirmPassword,
            &ValidateRequest {
                value: "Abcdefg1!".into(),
                password: None,
            },
        );
        assert!(!response.result.is_valid());
    }
}
