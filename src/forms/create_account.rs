use parking_lot::Mutex;

use super::{FormFeedback, SubmitError, SubmitGate};
use crate::identity::{AccountId, IdentityProvider};
use crate::logging::{SanitizedEmail, SecurityEvent};
use crate::session::{FieldRule, FieldSession, RecomputeMode};
use crate::validation::{PasswordPolicy, PasswordStrength, ValidationResult, compute_strength};

/// Account-creation form: email, password with live strength meter, and confirmation.
///
/// The email is only checked on blur and submit. Password and confirmation are
/// checked on every keystroke, and a password edit re-checks a dirty confirmation.
#[derive(Debug)]
pub struct CreateAccountForm {
    email: FieldSession,
    password: FieldSession,
    confirm: FieldSession,
    gate: SubmitGate,
    banner: Mutex<Option<&'static str>>,
}

impl CreateAccountForm {
    pub fn new() -> Self {
        Self {
            email: FieldSession::new(FieldRule::Email, RecomputeMode::OnBlur),
            password: FieldSession::new(
                FieldRule::Password(PasswordPolicy::CreateAccount),
                RecomputeMode::Immediate,
            ),
            confirm: FieldSession::new(FieldRule::ConfirmPassword, RecomputeMode::Immediate),
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
        let value = value.into();
        self.password.on_value_change(value.clone());
        self.confirm.set_reference(value);
    }

    pub fn on_password_blur(&self) -> ValidationResult {
        self.password.on_blur()
    }

    pub fn on_confirm_change(&self, value: impl Into<String>) {
        self.confirm.on_value_change(value);
    }

    pub fn on_confirm_blur(&self) -> ValidationResult {
        self.confirm.on_blur()
    }

    pub fn email_result(&self) -> ValidationResult {
        self.email.result()
    }

    pub fn password_result(&self) -> ValidationResult {
        self.password.result()
    }

    pub fn confirm_result(&self) -> ValidationResult {
        self.confirm.result()
    }

    /// Strength of the current password, shown whether or not the field is dirty.
    pub fn strength(&self) -> PasswordStrength {
        compute_strength(&self.password.value())
    }

    /// Short status next to the password label once the field is dirty.
    pub fn password_status(&self) -> Option<&'static str> {
        let result = self.password.result();
        if !result.is_dirty() {
            None
        } else if result.is_valid() {
            Some("Strong")
        } else {
            Some("Not strong enough")
        }
    }

    /// Short status next to the confirmation label once the field is dirty.
    pub fn confirm_status(&self) -> Option<String> {
        let result = self.confirm.result();
        if !result.is_dirty() {
            None
        } else if result.is_valid() {
            Some("Matched".to_string())
        } else {
            Some(result.message().to_string())
        }
    }

    pub fn banner(&self) -> Option<&'static str> {
        *self.banner.lock()
    }

    pub fn is_submitting(&self) -> bool {
        self.gate.is_submitting()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_submitting()
            && self.email.is_valid()
            && self.password.is_valid()
            && self.confirm.is_valid()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_submitting() {
            "Creating Account..."
        } else {
            "Create Account"
        }
    }

    pub fn reset(&self) {
        self.email.reset();
        self.password.reset();
        self.confirm.reset();
        self.confirm.set_reference(String::new());
        *self.banner.lock() = None;
    }

    /// Revalidates all three fields and, if they pass, creates the account.
    pub async fn submit<P>(&self, provider: &P) -> Result<AccountId, SubmitError>
    where
        P: IdentityProvider + ?Sized,
    {
        let feedback = FormFeedback::new()
            .with("email", self.email.on_submit_attempt())
            .with("password", self.password.on_submit_attempt())
            .with("confirm_password", self.confirm.on_submit_attempt());

        if !feedback.all_valid() {
            crate::log_security_event!(
                SecurityEvent::SubmissionRejected,
                form = "create_account",
                invalid_fields = ?feedback.invalid_fields(),
                "Account creation rejected by field validation"
            );
            return Err(SubmitError::InvalidFields(feedback));
        }

        let Some(_guard) = self.gate.try_begin() else {
            crate::log_security_event!(
                SecurityEvent::DuplicateSubmission,
                form = "create_account",
                "Account creation submitted while a previous attempt is pending"
            );
            return Err(SubmitError::AlreadySubmitting);
        };
        *self.banner.lock() = None;

        let email = self.email.value();
        let password = self.password.value();

        match provider.create_account(&email, &password).await {
            Ok(account_id) => {
                crate::log_security_event!(
                    SecurityEvent::AccountCreated,
                    account_id = %account_id,
                    email = %SanitizedEmail::new(&email),
                    "Account created successfully"
                );
                Ok(account_id)
            }
            Err(err) => {
                crate::log_security_event!(
                    SecurityEvent::AccountCreationFailure,
                    email = %SanitizedEmail::new(&email),
                    error = %err,
                    "Account creation failed"
                );
                *self.banner.lock() = Some(err.user_message());
                Err(err.into())
            }
        }
    }
}

impl Default for CreateAccountForm {
    fn default() -> Self {
        Self::new()
    }
}
