//! Fixed-point decimal cells that keep their textual precision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DatamarkError, Result};

/// Largest supported number of decimal places (10^18 still fits an `i64`).
pub const MAX_DECIMAL_PLACES: u32 = 18;

/// A decimal value stored as `units / 10^places`.
///
/// `places` is the number of digits after the separator in the value's
/// textual form, so `"3.20"` parses to `320 / 10^2` and renders back as
/// `"3.20"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalValue {
    units: i64,
    places: u32,
}

impl DecimalValue {
    pub fn new(units: i64, places: u32) -> Result<Self> {
        if places > MAX_DECIMAL_PLACES {
            return Err(DatamarkError::InvalidDecimal(format!(
                "{places} decimal places exceeds the maximum of {MAX_DECIMAL_PLACES}"
            )));
        }
        Ok(Self { units, places })
    }

    /// Scaled integer representation.
    pub fn units(&self) -> i64 {
        self.units
    }

    /// Digits after the separator.
    pub fn places(&self) -> u32 {
        self.places
    }

    /// Parse the textual form (`-12.340`, `7`, `.5`).
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || DatamarkError::InvalidDecimal(text.to_string());
        let trimmed = text.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let places = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        if places > MAX_DECIMAL_PLACES {
            return Err(invalid());
        }

        let mut magnitude: i64 = 0;
        for digit in int_part.bytes().chain(frac_part.bytes()) {
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add(i64::from(digit - b'0')))
                .ok_or_else(invalid)?;
        }
        let units = if negative { -magnitude } else { magnitude };
        Ok(Self { units, places })
    }
}

impl FromStr for DecimalValue {
    type Err = DatamarkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.units < 0 { "-" } else { "" };
        let magnitude = self.units.unsigned_abs();
        if self.places == 0 {
            return write!(f, "{sign}{magnitude}");
        }
        let scale = 10u64.pow(self.places);
        let width = self.places as usize;
        write!(
            f,
            "{sign}{}.{:0width$}",
            magnitude / scale,
            magnitude % scale,
        )
    }
}

/// Count the digits after the decimal separator of a rendered number.
///
/// Returns 0 when the text has no separator.
pub fn decimal_places(text: &str) -> u32 {
    text.rsplit_once('.')
        .map(|(_, frac)| frac.chars().take_while(char::is_ascii_digit).count() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_trailing_zeros() {
        let value = DecimalValue::parse("3.20").unwrap();
        assert_eq!(value.units(), 320);
        assert_eq!(value.places(), 2);
        assert_eq!(value.to_string(), "3.20");
    }

    #[test]
    fn test_parse_integer_text() {
        let value = DecimalValue::parse("42").unwrap();
        assert_eq!(value.units(), 42);
        assert_eq!(value.places(), 0);
        assert_eq!(value.to_string(), "42");
    }

    #[test]
    fn test_parse_negative_and_leading_separator() {
        let value = DecimalValue::parse("-0.05").unwrap();
        assert_eq!(value.units(), -5);
        assert_eq!(value.places(), 2);
        assert_eq!(value.to_string(), "-0.05");

        let value = DecimalValue::parse(".5").unwrap();
        assert_eq!(value.units(), 5);
        assert_eq!(value.to_string(), "0.5");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in ["", "-", ".", "1.2.3", "1e5", "abc", "12a"] {
            assert!(DecimalValue::parse(text).is_err(), "{text:?} should fail");
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(DecimalValue::parse("99999999999999999999").is_err());
        assert!(DecimalValue::parse("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places("12.345"), 3);
        assert_eq!(decimal_places("12"), 0);
        assert_eq!(decimal_places("-0.10"), 2);
        assert_eq!(decimal_places("5."), 0);
    }

    #[test]
    fn test_new_rejects_excess_places() {
        assert!(DecimalValue::new(1, MAX_DECIMAL_PLACES).is_ok());
        assert!(DecimalValue::new(1, MAX_DECIMAL_PLACES + 1).is_err());
    }
}
