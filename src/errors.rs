use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::forms::{FormFeedback, SubmitError};
use crate::identity::{CreateAccountError, SignInError};

/// Centralized application error type that encompasses all error variants
/// across different modules and provides consistent error responses.
#[derive(Debug, Error)]
pub enum AppError {
    // Form errors
    #[error("one or more fields are invalid")]
    InvalidFields(FormFeedback),

    #[error("a submission is already in progress")]
    AlreadySubmitting,

    // Identity service errors
    #[error(transparent)]
    CreateAccount(CreateAccountError),

    #[error(transparent)]
    SignIn(SignInError),

    // Rate limiting
    #[error("rate limit exceeded; please try again later")]
    RateLimitExceeded { retry_after: Option<Duration> },

    // Request parsing errors
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("unsupported media type: expected application/json")]
    UnsupportedMediaType,

    #[error("request body too large")]
    PayloadTooLarge,
}

/// Standard JSON error response structure
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FormFeedback>,
}

impl AppError {
    /// Determines the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client errors
            AppError::InvalidFields(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AlreadySubmitting => StatusCode::CONFLICT,
            AppError::CreateAccount(CreateAccountError::EmailAlreadyInUse) => StatusCode::CONFLICT,
            AppError::CreateAccount(CreateAccountError::InvalidEmail) => StatusCode::BAD_REQUEST,
            AppError::CreateAccount(CreateAccountError::WeakPassword) => StatusCode::BAD_REQUEST,
            AppError::SignIn(SignInError::InvalidCredential) => StatusCode::UNAUTHORIZED,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            // 5xx Server errors
            AppError::CreateAccount(CreateAccountError::Other(_)) => StatusCode::BAD_GATEWAY,
            AppError::SignIn(SignInError::Other(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Determines if error details should be exposed to the client
    /// In production (release builds), we hide upstream failure details
    fn should_expose_details(&self) -> bool {
        cfg!(debug_assertions) || self.status_code().is_client_error()
    }

    /// Gets the user-facing error message. Identity failures use the form banner.
    fn user_message(&self) -> String {
        match self {
            AppError::CreateAccount(err) => err.user_message().to_string(),
            AppError::SignIn(err) => err.user_message().to_string(),
            other => other.to_string(),
        }
    }

    /// Gets optional detailed error information
    /// Only included in debug builds or for client errors
    fn error_details(&self) -> Option<String> {
        if !self.should_expose_details() {
            return None;
        }

        match self {
            AppError::CreateAccount(CreateAccountError::Other(reason))
            | AppError::SignIn(SignInError::Other(reason)) => {
                Some(format!("identity service: {}", reason))
            }
            _ => None,
        }
    }

    /// Logs the error with appropriate context
    fn log_error(&self) {
        match self.status_code() {
            code if code.is_client_error() => {
                tracing::warn!(
                    error = %self,
                    status_code = %code,
                    "Client error"
                );
            }
            code if code.is_server_error() => {
                tracing::error!(
                    error = %self,
                    status_code = %code,
                    source = ?self.source(),
                    "Server error"
                );
            }
            _ => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before converting to response
        self.log_error();

        let status = self.status_code();
        let user_message = self.user_message();
        let details = self.error_details();
        let retry_after = match &self {
            AppError::RateLimitExceeded { retry_after } => *retry_after,
            _ => None,
        };
        let fields = match self {
            AppError::InvalidFields(feedback) => Some(feedback),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: user_message,
            details,
            fields,
        });

        let mut response = (status, body).into_response();
        if let Some(retry_after) = retry_after
            && let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string())
        {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}

// Conversion implementations for common error types

impl From<SubmitError> for AppError {
    fn from(error: SubmitError) -> Self {
        match error {
            SubmitError::InvalidFields(feedback) => AppError::InvalidFields(feedback),
            SubmitError::AlreadySubmitting => AppError::AlreadySubmitting,
            SubmitError::CreateAccount(err) => AppError::CreateAccount(err),
            SubmitError::SignIn(err) => AppError::SignIn(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate_email;

    #[test]
    fn test_invalid_fields_status() {
        let error = AppError::InvalidFields(FormFeedback::new().with("email", validate_email("")));
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_identity_error_statuses() {
        assert_eq!(
            AppError::CreateAccount(CreateAccountError::EmailAlreadyInUse).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::SignIn(SignInError::InvalidCredential).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::SignIn(SignInError::Other("timeout".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_rate_limit_error_status() {
        let error = AppError::RateLimitExceeded { retry_after: None };
        assert_eq!(error.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_identity_errors_use_banner_text() {
        let error = AppError::CreateAccount(CreateAccountError::WeakPassword);
        assert_eq!(
            error.user_message(),
            "The password is too weak. Please choose a stronger password."
        );
    }

    #[test]
    fn test_submit_errors_convert() {
        let error = AppError::from(SubmitError::AlreadySubmitting);
        assert!(matches!(error, AppError::AlreadySubmitting));
        assert!(error.should_expose_details());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_upstream_details_exposed_in_debug() {
        let error = AppError::SignIn(SignInError::Other("quota exceeded".into()));
        assert_eq!(
            error.error_details(),
            Some("identity service: quota exceeded".to_string())
        );
    }

    #[test]
    fn test_rate_limit_response_sets_retry_after() {
        let response = AppError::RateLimitExceeded {
            retry_after: Some(Duration::from_secs(42)),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()),
            Some("42")
        );
    }
}
