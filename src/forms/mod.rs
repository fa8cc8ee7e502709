pub mod create_account;
pub mod sign_in;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::identity::{CreateAccountError, SignInError};
use crate::validation::ValidationResult;

pub use create_account::CreateAccountForm;
pub use sign_in::SignInForm;

/// Per-field results captured when a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FormFeedback {
    fields: BTreeMap<&'static str, ValidationResult>,
}

impl FormFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &'static str, result: ValidationResult) -> Self {
        self.fields.insert(field, result);
        self
    }

    pub fn all_valid(&self) -> bool {
        self.fields.values().all(ValidationResult::is_valid)
    }

    /// Names of the fields that failed, in name order.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, result)| !result.is_valid())
            .map(|(name, _)| *name)
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("one or more fields are invalid")]
    InvalidFields(FormFeedback),
    #[error("a submission is already in progress")]
    AlreadySubmitting,
    #[error(transparent)]
    CreateAccount(#[from] CreateAccountError),
    #[error(transparent)]
    SignIn(#[from] SignInError),
}

/// Disables a form's submit control while an identity call is in flight.
#[derive(Debug, Default)]
pub struct SubmitGate {
    submitting: AtomicBool,
}

impl SubmitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the gate, or `None` when another submission holds it.
    pub fn try_begin(&self) -> Option<SubmitGuard<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitGuard { gate: self })
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }
}

/// Re-enables submission when dropped, whatever the outcome was.
#[derive(Debug)]
pub struct SubmitGuard<'a> {
    gate: &'a SubmitGate,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.gate.submitting.store(false, Ordering::Release);
    }
}
