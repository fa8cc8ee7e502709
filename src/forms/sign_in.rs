use std::time::Duration;

use parking_lot::Mutex;

use super::{FormFeedback, SubmitError, SubmitGate};
use crate::identity::{AccountId, IdentityProvider};
use crate::logging::{SanitizedEmail, SecurityEvent};
use crate::session::{FieldRule, FieldSession, RecomputeMode};
use crate::validation::{PasswordPolicy, ValidationResult};

/// Email + password sign-in form. Both fields revalidate after a quiet period.
#[derive(Debug)]
pub struct SignInForm {
    email: FieldSession,
    password: FieldSession,
    gate: SubmitGate,
    banner: Mutex<Option<&'static str>>,
}

impl SignInForm {
    pub fn new(debounce: Duration) -> Self {
        Self {
            email: FieldSession::new(FieldRule::Email, RecomputeMode::Debounced(debounce)),
            password: FieldSession::new(
                FieldRule::Password(PasswordPolicy::SignIn),
                RecomputeMode::Debounced(debounce),
            ),
            gate: SubmitGate::new(),
            banner: Mutex::new(None),
        }
    }

    pub fn on_email_change(&self, value: impl Into<String>) {
        self.email.on_value_change(value);
    }

    pub fn on_email_blur(&self) -> ValidationResult {
        self.email.on_blur()
    }

    pub fn on_password_change(&self, value: impl Into<String>) {
        self.password.on_value_change(value);
    }

    pub fn on_password_blur(&self) -> ValidationResult {
        self.password.on_blur()
    }

    pub fn email_result(&self) -> ValidationResult {
        self.email.result()
    }

    pub fn password_result(&self) -> ValidationResult {
        self.password.result()
    }

    pub fn banner(&self) -> Option<&'static str> {
        *self.banner.lock()
    }

    pub fn is_submitting(&self) -> bool {
        self.gate.is_submitting()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && self.email.is_valid() && self.password.is_valid()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_submitting() {
            "Signing In..."
        } else {
            "Sign In"
        }
    }

    pub fn reset(&self) {
        self.email.reset();
        self.password.reset();
        *self.banner.lock() = None;
    }

    /// Revalidates both fields and, if they pass, signs in through `provider`.
    ///
    /// On success the form is cleared. Provider failures are kept as the form banner.
    pub async fn submit<P>(&self, provider: &P) -> Result<AccountId, SubmitError>
    where
        P: IdentityProvider + ?Sized,
    {
        let feedback = FormFeedback::new()
            .with("email", self.email.on_submit_attempt())
            .with("password", self.password.on_submit_attempt());

        if !feedback.all_valid() {
            crate::log_security_event!(
                SecurityEvent::SubmissionRejected,
                form = "sign_in",
                invalid_fields = ?feedback.invalid_fields(),
                "Sign-in submission rejected by field validation"
            );
            return Err(SubmitError::InvalidFields(feedback));
        }

        let Some(_guard) = self.gate.try_begin() else {
            crate::log_security_event!(
                SecurityEvent::DuplicateSubmission,
                form = "sign_in",
                "Sign-in submitted while a previous attempt is pending"
            );
            return Err(SubmitError::AlreadySubmitting);
        };
        *self.banner.lock() = None;

        let email = self.email.value();
        let password = self.password.value();

        match provider.sign_in(&email, &password).await {
            Ok(account_id) => {
                crate::log_security_event!(
                    SecurityEvent::SignInSuccess,
                    account_id = %account_id,
                    email = %SanitizedEmail::new(&email),
                    "User signed in successfully"
                );
                self.email.reset();
                self.password.reset();
                Ok(account_id)
            }
            Err(err) => {
                crate::log_security_event!(
                    SecurityEvent::SignInFailure,
                    email = %SanitizedEmail::new(&email),
                    error = %err,
                    "Sign in failed"
                );
                *self.banner.lock() = Some(err.user_message());
                Err(err.into())
            }
        }
    }
}
