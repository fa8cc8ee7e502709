use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::{MIN_PASSWORD_LENGTH, PASSWORD_SYMBOLS};

/// Live password-quality checks behind the strength meter.
///
/// Independent of validity: a password can score 4 and still be rejected by a
/// policy, and the meter is shown before the field is dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordStrength {
    pub min_length: bool,
    pub has_digit: bool,
    pub has_symbol: bool,
    pub has_uppercase: bool,
}

impl PasswordStrength {
    /// Number of satisfied checks, 0 to 4.
    pub fn score(&self) -> u8 {
        [
            self.min_length,
            self.has_digit,
            self.has_symbol,
            self.has_uppercase,
        ]
        .into_iter()
        .filter(|check| *check)
        .count() as u8
    }

    pub fn label(&self) -> &'static str {
        match self.score() {
            0 => "Very weak",
            1 => "Weak",
            2 => "Fair",
            3 => "Good",
            _ => "Strong",
        }
    }
}

impl Serialize for PasswordStrength {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("PasswordStrength", 6)?;
        state.serialize_field("min_length", &self.min_length)?;
        state.serialize_field("has_digit", &self.has_digit)?;
        state.serialize_field("has_symbol", &self.has_symbol)?;
        state.serialize_field("has_uppercase", &self.has_uppercase)?;
        state.serialize_field("score", &self.score())?;
        state.serialize_field("label", self.label())?;
        state.end()
    }
}

pub fn compute_strength(value: &str) -> PasswordStrength {
    PasswordStrength {
        min_length: meets_min_length(value),
        has_digit: has_digit(value),
        has_symbol: has_symbol(value),
        has_uppercase: has_uppercase(value),
    }
}

// Counted in chars (scalar values). A browser counts UTF-16 code units, so a
// password of astral-plane emoji can pass there and still fail here.
pub(crate) fn meets_min_length(value: &str) -> bool {
    value.chars().count() >= MIN_PASSWORD_LENGTH
}

pub(crate) fn has_digit(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

pub(crate) fn has_symbol(value: &str) -> bool {
    value.chars().any(|c| PASSWORD_SYMBOLS.contains(&c))
}

pub(crate) fn has_uppercase(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_uppercase())
}
