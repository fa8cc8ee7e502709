pub mod strength;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub use strength::{PasswordStrength, compute_strength};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Characters that satisfy the "special character" password rule.
pub const PASSWORD_SYMBOLS: &[char] = &[
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', ',', '.', '?', '"', ':', '{', '}', '|',
    '<', '>',
];

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern must compile")
});

/// The first rule a field value breaks. The display text is what the form shows inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Password must contain at least one number")]
    PasswordMissingDigit,
    #[error("Password must contain at least one special character")]
    PasswordMissingSymbol,
    #[error("Password must contain at least one uppercase letter")]
    PasswordMissingUppercase,
    #[error("Please confirm your password")]
    ConfirmationRequired,
    #[error("Passwords do not match")]
    ConfirmationMismatch,
}

/// Which password rules apply.
///
/// Sign-in deliberately skips the uppercase rule: accounts created before that rule
/// existed must still be able to sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPolicy {
    SignIn,
    CreateAccount,
}

impl PasswordPolicy {
    pub fn requires_uppercase(self) -> bool {
        matches!(self, PasswordPolicy::CreateAccount)
    }
}

/// Outcome of validating one field value.
///
/// A valid result never carries a message, and a result that is not dirty must not
/// have its message shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    valid: bool,
    message: String,
    dirty: bool,
}

impl ValidationResult {
    /// The state of a field nobody has touched yet.
    pub fn pristine() -> Self {
        Self {
            valid: false,
            message: String::new(),
            dirty: false,
        }
    }

    pub fn evaluated(check: Result<(), FieldError>) -> Self {
        match check {
            Ok(()) => Self {
                valid: true,
                message: String::new(),
                dirty: true,
            },
            Err(err) => Self {
                valid: false,
                message: err.to_string(),
                dirty: true,
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message the UI may render: only for dirty, failing fields.
    pub fn visible_message(&self) -> Option<&str> {
        if self.dirty && !self.valid && !self.message.is_empty() {
            Some(&self.message)
        } else {
            None
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::pristine()
    }
}

pub fn validate_email(value: &str) -> ValidationResult {
    ValidationResult::evaluated(ensure_valid_email(value))
}

pub fn validate_password(value: &str, policy: PasswordPolicy) -> ValidationResult {
    ValidationResult::evaluated(ensure_valid_password(value, policy))
}

pub fn validate_confirm_password(value: &str, password: &str) -> ValidationResult {
    ValidationResult::evaluated(ensure_passwords_match(value, password))
}

pub(crate) fn ensure_valid_email(value: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::EmailRequired);
    }

    if !EMAIL_PATTERN.is_match(value) {
        tracing::debug!(
            length = value.len(),
            has_at = value.contains('@'),
            "Email validation failed: pattern mismatch"
        );
        return Err(FieldError::InvalidEmail);
    }

    Ok(())
}

pub(crate) fn ensure_valid_password(value: &str, policy: PasswordPolicy) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::PasswordRequired);
    }

    if !strength::meets_min_length(value) {
        tracing::debug!(
            length = value.chars().count(),
            "Password validation failed: too short (minimum 8 characters)"
        );
        return Err(FieldError::PasswordTooShort);
    }

    if !strength::has_digit(value) {
        return Err(FieldError::PasswordMissingDigit);
    }

    if !strength::has_symbol(value) {
        return Err(FieldError::PasswordMissingSymbol);
    }

    if policy.requires_uppercase() && !strength::has_uppercase(value) {
        return Err(FieldError::PasswordMissingUppercase);
    }

    Ok(())
}

pub(crate) fn ensure_passwords_match(value: &str, password: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::ConfirmationRequired);
    }

    if value != password {
        return Err(FieldError::ConfirmationMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn message_of(result: &ValidationResult) -> &str {
        result.message()
    }

    #[test]
    fn test_email_required() {
        let result = validate_email("");
        assert!(!result.is_valid());
        assert!(result.is_dirty());
        assert_eq!(message_of(&result), "Email is required");
    }

    #[test]
    fn test_email_grammar() {
        for accepted in [
            "user@example.com",
            "first.last+tag@sub.domain.org",
            "a_b%c-d@host-1.io",
            "x@y.museum",
            "a@b..cd",
        ] {
            assert!(validate_email(accepted).is_valid(), "{accepted} should pass");
        }

        for rejected in [
            "plainaddress",
            "@example.com",
            "user@",
            "user@example",
            "user@example.c",
            "user@example.c0m",
            "user name@example.com",
            "user@exa mple.com",
            "user@@example.com",
            "user@example.com ",
            "üser@example.com",
        ] {
            let result = validate_email(rejected);
            assert!(!result.is_valid(), "{rejected} should fail");
            assert_eq!(message_of(&result), "Please enter a valid email address");
        }
    }

    #[test]
    fn test_short_email_with_two_letter_tld() {
        assert!(!validate_email("a@b.c").is_valid());
        assert!(validate_email("a@b.co").is_valid());
    }

    #[test]
    fn test_password_rules_in_order() {
        let policy = PasswordPolicy::CreateAccount;
        assert_eq!(
            message_of(&validate_password("", policy)),
            "Password is required"
        );
        assert_eq!(
            message_of(&validate_password("abc", policy)),
            "Password must be at least 8 characters"
        );
        assert_eq!(
            message_of(&validate_password("abcdefgh!", policy)),
            "Password must contain at least one number"
        );
        assert_eq!(
            message_of(&validate_password("Abcdefg1", policy)),
            "Password must contain at least one special character"
        );
        assert_eq!(
            message_of(&validate_password("abcdefg1!", policy)),
            "Password must contain at least one uppercase letter"
        );

        let result = validate_password("Abcdefg1!", policy);
        assert!(result.is_valid());
        assert_eq!(message_of(&result), "");
    }

    #[test]
    fn test_short_password_reports_length_before_other_rules() {
        let result = validate_password("abc", PasswordPolicy::SignIn);
        assert!(!result.is_valid());
        assert_eq!(message_of(&result), "Password must be at least 8 characters");
    }

    #[test]
    fn test_length_rule_counts_chars_not_utf16_units() {
        // Six chars, but ten UTF-16 code units: a browser's `length` would accept it.
        let result = validate_password("😀😀😀😀1!", PasswordPolicy::SignIn);
        assert!(!result.is_valid());
        assert_eq!(message_of(&result), "Password must be at least 8 characters");

        assert!(validate_password("😀😀😀😀😀😀1!", PasswordPolicy::SignIn).is_valid());
    }

    #[test]
    fn test_sign_in_policy_skips_uppercase_rule() {
        assert!(validate_password("abcdefg1!", PasswordPolicy::SignIn).is_valid());
        assert!(!validate_password("abcdefg1!", PasswordPolicy::CreateAccount).is_valid());
    }

    #[test]
    fn test_every_listed_symbol_is_accepted() {
        for symbol in PASSWORD_SYMBOLS {
            let candidate = format!("Abcdefg1{symbol}");
            assert!(
                validate_password(&candidate, PasswordPolicy::CreateAccount).is_valid(),
                "{symbol} should count as a special character"
            );
        }
    }

    #[test]
    fn test_unlisted_symbols_do_not_count() {
        for candidate in ["Abcdefg1-", "Abcdefg1_", "Abcdefg1 ", "Abcdefg1~", "Abcdefg1/"] {
            assert_eq!(
                message_of(&validate_password(candidate, PasswordPolicy::SignIn)),
                "Password must contain at least one special character"
            );
        }
    }

    #[test]
    fn test_confirm_password() {
        assert_eq!(
            message_of(&validate_confirm_password("", "Abcdefg1!")),
            "Please confirm your password"
        );
        assert_eq!(
            message_of(&validate_confirm_password("Abcdefg1", "Abcdefg1!")),
            "Passwords do not match"
        );
        assert!(validate_confirm_password("Abcdefg1!", "Abcdefg1!").is_valid());
        assert!(!validate_confirm_password("", "").is_valid());
    }

    #[test]
    fn test_validators_are_idempotent() {
        for value in ["", "abc", "Abcdefg1!", "user@example.com", "broken@"] {
            assert_eq!(validate_email(value), validate_email(value));
            assert_eq!(
                validate_password(value, PasswordPolicy::CreateAccount),
                validate_password(value, PasswordPolicy::CreateAccount)
            );
            assert_eq!(
                validate_confirm_password(value, "Abcdefg1!"),
                validate_confirm_password(value, "Abcdefg1!")
            );
        }
    }

    #[test]
    fn test_valid_results_never_carry_a_message() {
        for value in ["", "abc", "Abcdefg1!", "abcdefg1!", "user@example.com"] {
            for result in [
                validate_email(value),
                validate_password(value, PasswordPolicy::SignIn),
                validate_password(value, PasswordPolicy::CreateAccount),
                validate_confirm_password(value, value),
            ] {
                assert!(!result.is_valid() || result.message().is_empty());
                assert!(result.is_dirty());
            }
        }
    }

    #[test]
    fn test_pristine_result_hides_message() {
        let pristine = ValidationResult::pristine();
        assert!(!pristine.is_valid());
        assert!(!pristine.is_dirty());
        assert_eq!(pristine.visible_message(), None);

        let failed = validate_email("");
        assert_eq!(failed.visible_message(), Some("Email is required"));
        assert_eq!(validate_email("a@b.co").visible_message(), None);
    }

    fn email_grammar() -> Regex {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
    }

    fn email_candidates() -> impl Strategy<Value = String> {
        prop_oneof![
            any::<String>(),
            "[a-zA-Z0-9._%+-]{1,10}@[a-zA-Z0-9.-]{1,10}\\.[a-zA-Z]{2,5}",
            "[a-z0-9@. ]{0,16}",
        ]
    }

    fn password_candidates() -> impl Strategy<Value = String> {
        prop_oneof![
            any::<String>(),
            r#"[a-zA-Z0-9!@#$%^&*(),.?":{}|<>_~é😀 -]{0,14}"#,
        ]
    }

    fn password_rules_hold(value: &str, policy: PasswordPolicy) -> bool {
        let symbols = "!@#$%^&*(),.?\":{}|<>";
        value.chars().count() >= 8
            && value.chars().any(|c| c.is_ascii_digit())
            && value.chars().any(|c| symbols.contains(c))
            && (policy == PasswordPolicy::SignIn
                || value.chars().any(|c| c.is_ascii_uppercase()))
    }

    proptest! {
        #[test]
        fn prop_email_valid_iff_grammar_matches(value in email_candidates()) {
            let result = validate_email(&value);
            prop_assert_eq!(result.is_valid(), email_grammar().is_match(&value));
            prop_assert!(result.is_dirty());
            prop_assert!(!result.is_valid() || result.message().is_empty());
        }

        #[test]
        fn prop_grammar_shaped_emails_are_valid(
            value in "[a-zA-Z0-9._%+-]{1,10}@[a-zA-Z0-9.-]{1,10}\\.[a-zA-Z]{2,5}"
        ) {
            prop_assert!(validate_email(&value).is_valid());
        }

        #[test]
        fn prop_password_valid_iff_rules_hold(
            value in password_candidates(),
            policy in prop_oneof![
                Just(PasswordPolicy::SignIn),
                Just(PasswordPolicy::CreateAccount),
            ]
        ) {
            let result = validate_password(&value, policy);
            prop_assert_eq!(result.is_valid(), password_rules_hold(&value, policy));
            prop_assert_eq!(result.is_valid(), result.message().is_empty());
        }

        #[test]
        fn prop_confirm_valid_iff_equal_and_non_empty(a in "[ab]{0,3}", b in "[ab]{0,3}") {
            let result = validate_confirm_password(&a, &b);
            prop_assert_eq!(result.is_valid(), a == b && !a.is_empty());
        }

        #[test]
        fn prop_validation_is_idempotent(value in any::<String>(), other in any::<String>()) {
            prop_assert_eq!(validate_email(&value), validate_email(&value));
            for policy in [PasswordPolicy::SignIn, PasswordPolicy::CreateAccount] {
                prop_assert_eq!(
                    validate_password(&value, policy),
                    validate_password(&value, policy)
                );
            }
            prop_assert_eq!(
                validate_confirm_password(&value, &other),
                validate_confirm_password(&value, &other)
            );
        }
    }
}
