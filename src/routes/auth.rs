use axum::http::StatusCode;
use axum::{Extension, Json, Router, middleware, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::errors::AppError;
use crate::forms::{CreateAccountForm, SignInForm};
use crate::identity::AccountId;
use crate::logging::{SanitizedEmail, SecurityEvent};
use crate::security::json::ValidatedJson;
use crate::security::rate_limit::{RateLimiterState, TrustedProxies, enforce_rate_limit};

pub fn router(trusted: &TrustedProxies) -> Router {
    Router::new()
        .route(
            "/auth/create-account",
            post(create_account).layer(middleware::from_fn_with_state(
                RateLimiterState::create_account().trusting(trusted.clone()),
                enforce_rate_limit,
            )),
        )
        .route(
            "/auth/sign-in",
            post(sign_in).layer(middleware::from_fn_with_state(
                RateLimiterState::sign_in().trusting(trusted.clone()),
                enforce_rate_limit,
            )),
        )
        .route("/auth/sign-out", post(sign_out))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAccountRequest {
    email: String,
    password: String,
    confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignInRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    account_id: AccountId,
}

/// Replays the submitted values through a fresh form, so the server applies the
/// same field rules, the same single-flight gate and the same banner mapping as the
/// interactive form.
#[tracing::instrument(
    name = "create_account",
    skip(state, payload),
    fields(email, account_id)
)]
pub async fn create_account(
    Extension(state): Extension<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current().record(
        "email",
        tracing::field::display(SanitizedEmail::new(&payload.email)),
    );

    let form = CreateAccountForm::new();
    form.on_email_change(payload.email);
    form.on_email_blur();
    form.on_password_change(payload.password);
    form.on_confirm_change(payload.confirm_password);

    let account_id = form.submit(state.provider.as_ref()).await?;
    tracing::Span::current().record("account_id", tracing::field::display(&account_id));

    Ok((StatusCode::CREATED, Json(AuthResponse { account_id })))
}

#[tracing::instrument(name = "sign_in", skip(state, payload), fields(email, account_id))]
pub async fn sign_in(
    Extension(state): Extension<AppState>,
    ValidatedJson(payload): ValidatedJson<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::Span::current().record(
        "email",
        tracing::field::display(SanitizedEmail::new(&payload.email)),
    );

    let form = SignInForm::new(state.sign_in_debounce);
    form.on_email_change(payload.email);
    form.on_password_change(payload.password);

    let account_id = form.submit(state.provider.as_ref()).await?;
    tracing::Span::current().record("account_id", tracing::field::display(&account_id));

    Ok((StatusCode::OK, Json(AuthResponse { account_id })))
}

#[tracing::instrument(name = "sign_out", skip(state))]
pub async fn sign_out(Extension(state): Extension<AppState>) -> StatusCode {
    state.provider.sign_out().await;
    crate::log_security_event!(SecurityEvent::SignOut, "User signed out");
    StatusCode::NO_CONTENT
}
