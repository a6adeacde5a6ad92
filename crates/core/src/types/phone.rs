//! Russian mobile phone numbers.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input has no digits at all.
    #[error("phone number cannot be empty")]
    Empty,
    /// The normalized number does not have 11 digits.
    #[error("phone number must have 11 digits starting with 7 (got {0})")]
    WrongLength(usize),
}

/// A phone number normalized to the Russian `7XXXXXXXXXX` form.
///
/// Normalization keeps only digits, turns a leading trunk prefix `8` into the
/// country code `7`, and prepends `7` when the country code is missing. The
/// stored form is digits only; `Display` and serialization use `+7XXXXXXXXXX`.
///
/// ```
/// use nexx_core::Phone;
///
/// let phone = Phone::parse("8 (900) 123-45-67").unwrap();
/// assert_eq!(phone.digits(), "79001234567");
/// assert_eq!(phone.to_string(), "+79001234567");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Phone(String);

impl Phone {
    /// Number of digits in a normalized number.
    pub const DIGITS: usize = 11;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] when the input has no digits and
    /// [`PhoneError::WrongLength`] when the normalized number is not 11 digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let mut digits: String = s.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }

        if let Some(rest) = digits.strip_prefix('8') {
            digits = format!("7{rest}");
        }
        if !digits.starts_with('7') {
            digits.insert(0, '7');
        }

        if digits.len() != Self::DIGITS {
            return Err(PhoneError::WrongLength(digits.len()));
        }
        Ok(Self(digits))
    }

    /// The normalized digits, e.g. `79001234567`.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Phone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Phone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_international_format() {
        let phone = Phone::parse("+79001234567").unwrap();
        assert_eq!(phone.digits(), "79001234567");
    }

    #[test]
    fn test_parse_trunk_prefix() {
        let phone = Phone::parse("89001234567").unwrap();
        assert_eq!(phone.digits(), "79001234567");
    }

    #[test]
    fn test_parse_missing_country_code() {
        let phone = Phone::parse("900 123 45 67").unwrap();
        assert_eq!(phone.digits(), "79001234567");
    }

    #[test]
    fn test_parse_rejects_empty_and_short() {
        assert_eq!(Phone::parse("+"), Err(PhoneError::Empty));
        assert_eq!(Phone::parse("12345"), Err(PhoneError::WrongLength(6)));
    }

    #[test]
    fn test_display_and_serde() {
        let phone = Phone::parse("8-900-123-45-68").unwrap();
        assert_eq!(phone.to_string(), "+79001234568");
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"+79001234568\"");
        let back: Phone = serde_json::from_str(&json).unwrap();
        assert_eq!(back, phone);
    }
}
