//! Phone number value object
//!
//! Accepts E.164-shaped numbers with or without a leading `+`, 7-20
//! digits, matching the bridge's closed validation rule (spec invariant
//! `ValidatePhoneNumber`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::validation::validate_phone_digits;

/// A validated Signal/WhatsApp destination phone number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parse and validate a phone number, normalizing surrounding
    /// whitespace and common formatting punctuation.
    pub fn new(number: impl Into<String>) -> Result<Self, DomainError> {
        let value = number.into().trim().replace([' ', '-', '(', ')'], "");

        if !validate_phone_digits(&value) {
            return Err(DomainError::InvalidPhoneNumber(value));
        }

        Ok(Self(value))
    }

    /// The phone number as originally formatted (with `+` if present)
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits only, without a leading `+`
    #[must_use]
    pub fn digits(&self) -> &str {
        self.0.strip_prefix('+').unwrap_or(&self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PhoneNumber {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_e164_with_plus() {
        let phone = PhoneNumber::new("+1234567890").unwrap();
        assert_eq!(phone.as_str(), "+1234567890");
        assert_eq!(phone.digits(), "1234567890");
    }

    #[test]
    fn accepts_bare_digits() {
        let phone = PhoneNumber::new("1234567890").unwrap();
        assert_eq!(phone.digits(), "1234567890");
    }

    #[test]
    fn normalizes_formatting_punctuation() {
        let phone = PhoneNumber::new("+1 (234) 567-8900").unwrap();
        assert_eq!(phone.as_str(), "+12345678900");
    }

    #[test]
    fn rejects_letters() {
        assert!(PhoneNumber::new("+1234abc").is_err());
    }

    #[test]
    fn rejects_too_short() {
        assert!(PhoneNumber::new("12345").is_err());
    }

    #[test]
    fn rejects_too_long() {
        assert!(PhoneNumber::new("+123456789012345678901").is_err());
    }
}
