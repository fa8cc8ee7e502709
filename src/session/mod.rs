//! Per-field validation state for interactive forms.
//!
//! A [`FieldSession`] owns the raw value of one input and the last
//! [`ValidationResult`] computed for it. The form feeds it change and blur events;
//! the session decides when to re-run the field's rule.

pub mod debounce;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::validation::{
    PasswordPolicy, ValidationResult, validate_confirm_password, validate_email,
    validate_password,
};

pub use debounce::Debouncer;

/// Debounce window for fields that revalidate while the user types.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Which validator a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Email,
    Password(PasswordPolicy),
    /// Compared against the session's reference value (the primary password).
    ConfirmPassword,
}

impl FieldRule {
    fn evaluate(self, value: &str, reference: &str) -> ValidationResult {
        match self {
            FieldRule::Email => validate_email(value),
            FieldRule::Password(policy) => validate_password(value, policy),
            FieldRule::ConfirmPassword => validate_confirm_password(value, reference),
        }
    }

    fn name(self) -> &'static str {
        match self {
            FieldRule::Email => "email",
            FieldRule::Password(_) => "password",
            FieldRule::ConfirmPassword => "confirm_password",
        }
    }
}

/// When a value change triggers revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeMode {
    /// On every change, synchronously.
    Immediate,
    /// Once the value has been stable for the given delay.
    Debounced(Duration),
    /// Not on change at all; only on blur and submit.
    OnBlur,
}

#[derive(Debug)]
struct FieldState {
    value: String,
    reference: String,
    result: ValidationResult,
    // Bumped on every change and forced recompute; a debounced run only commits if
    // nothing happened since it was scheduled.
    generation: u64,
}

impl FieldState {
    fn new() -> Self {
        Self {
            value: String::new(),
            reference: String::new(),
            result: ValidationResult::pristine(),
            generation: 0,
        }
    }

    fn recompute(&mut self, rule: FieldRule) -> ValidationResult {
        self.result = rule.evaluate(&self.value, &self.reference);
        self.result.clone()
    }
}

#[derive(Debug)]
pub struct FieldSession {
    rule: FieldRule,
    mode: RecomputeMode,
    state: Arc<Mutex<FieldState>>,
    debouncer: Option<Debouncer>,
}

impl FieldSession {
    pub fn new(rule: FieldRule, mode: RecomputeMode) -> Self {
        let debouncer = match mode {
            RecomputeMode::Debounced(delay) => Some(Debouncer::new(delay)),
            RecomputeMode::Immediate | RecomputeMode::OnBlur => None,
        };

        Self {
            rule,
            mode,
            state: Arc::new(Mutex::new(FieldState::new())),
            debouncer,
        }
    }

    /// Stores a new raw value and marks the field dirty.
    ///
    /// The held message is left as is until the mode's recompute runs, so error
    /// affordances can appear as soon as typing starts.
    pub fn on_value_change(&self, value: impl Into<String>) {
        let mut state = self.state.lock();
        state.value = value.into();
        state.result.mark_dirty();
        state.generation += 1;

        match self.mode {
            RecomputeMode::Immediate => {
                state.recompute(self.rule);
            }
            RecomputeMode::Debounced(_) => {
                if let Some(debouncer) = &self.debouncer {
                    // Scheduled under the state lock, so the run left pending always
                    // belongs to the newest generation.
                    let generation = state.generation;
                    let shared = Arc::clone(&self.state);
                    let rule = self.rule;
                    let scheduled = debouncer.schedule(move || {
                        let mut state = shared.lock();
                        if state.generation == generation {
                            state.recompute(rule);
                        }
                    });
                    if scheduled.is_err() {
                        state.recompute(self.rule);
                    }
                }
            }
            RecomputeMode::OnBlur => {}
        }
    }

    pub fn on_blur(&self) -> ValidationResult {
        self.recompute_now()
    }

    /// Revalidates regardless of dirtiness and returns the fresh result.
    pub fn on_submit_attempt(&self) -> ValidationResult {
        let result = self.recompute_now();
        tracing::trace!(
            field = self.rule.name(),
            valid = result.is_valid(),
            "Field revalidated for submission"
        );
        result
    }

    /// Updates the value this field is compared against.
    ///
    /// A dirty field is revalidated right away so a stale match is never shown after
    /// the referenced value moves. Returns the new result when that happens.
    pub fn set_reference(&self, reference: impl Into<String>) -> Option<ValidationResult> {
        let dirty = {
            let mut state = self.state.lock();
            state.reference = reference.into();
            state.result.is_dirty()
        };

        dirty.then(|| self.recompute_now())
    }

    pub fn reset(&self) {
        self.cancel_pending();
        let mut state = self.state.lock();
        state.value.clear();
        state.result = ValidationResult::pristine();
        state.generation += 1;
    }

    pub fn result(&self) -> ValidationResult {
        self.state.lock().result.clone()
    }

    pub fn value(&self) -> String {
        self.state.lock().value.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.lock().result.is_dirty()
    }

    pub fn is_valid(&self) -> bool {
        self.state.lock().result.is_valid()
    }

    /// Whether a debounced recompute is still waiting to run.
    pub fn is_pending(&self) -> bool {
        self.debouncer
            .as_ref()
            .is_some_and(|debouncer| debouncer.is_pending())
    }

    fn recompute_now(&self) -> ValidationResult {
        self.cancel_pending();
        let mut state = self.state.lock();
        state.generation += 1;
        state.recompute(self.rule)
    }

    fn cancel_pending(&self) {
        if let Some(debouncer) = &self.debouncer {
            debouncer.cancel();
        }
    }
}
