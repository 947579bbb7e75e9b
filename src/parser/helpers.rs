//! Helper functions for NMEA field parsing
//!
//! Fixed-width ASCII digit groups and the optional decimal fields used by the
//! RMC and GGA sentences.

use crate::error::{JournalError, Result};

/// Decode one ASCII digit, rejecting anything outside `0`-`9`
pub fn ascii_digit(byte: u8) -> Result<u32> {
    if byte.is_ascii_digit() {
        Ok((byte - b'0') as u32)
    } else {
        Err(JournalError::MalformedFix(format!(
            "expected digit, found {:?}",
            byte as char
        )))
    }
}

/// Decode `count` leading digits of `field` as a decimal number
pub fn leading_digits(field: &str, count: usize) -> Result<u32> {
    let bytes = field.as_bytes();
    if bytes.len() < count {
        return Err(JournalError::MalformedFix(format!(
            "field {:?} shorter than {} digits",
            field, count
        )));
    }

    bytes[..count]
        .iter()
        .try_fold(0u32, |acc, &b| Ok(acc * 10 + ascii_digit(b)?))
}

/// Split a six digit `aabbcc` group into its three pairs
pub fn digit_pairs(field: &str) -> Result<(u32, u32, u32)> {
    let value = leading_digits(field, 6)?;
    Ok((value / 10_000, (value / 100) % 100, value % 100))
}

/// Parse a decimal field, naming the field in the error
pub fn decimal(field: &str, name: &str) -> Result<f64> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| JournalError::MalformedFix(format!("invalid {}: {:?}", name, field)))
}

/// Parse an optional decimal field; empty and zero readings are both absent
pub fn nonzero_decimal(field: &str, name: &str) -> Result<Option<f64>> {
    if field.trim().is_empty() {
        return Ok(None);
    }

    let value = decimal(field, name)?;
    Ok(if value != 0.0 { Some(value) } else { None })
}

/// Parse an integer field, naming the field in the error
pub fn integer(field: &str, name: &str) -> Result<i32> {
    field
        .trim()
        .parse::<i32>()
        .map_err(|_| JournalError::MalformedFix(format!("invalid {}: {:?}", name, field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_digit() {
        assert_eq!(ascii_digit(b'0').unwrap(), 0);
        assert_eq!(ascii_digit(b'9').unwrap(), 9);
        assert!(ascii_digit(b'a').is_err());
        assert!(ascii_digit(b'.').is_err());
    }

    #[test]
    fn test_digit_pairs() {
        assert_eq!(digit_pairs("123519").unwrap(), (12, 35, 19));
        assert_eq!(digit_pairs("010203.50").unwrap(), (1, 2, 3));
        assert!(digit_pairs("12351").is_err());
        assert!(digit_pairs("12a519").is_err());
    }

    #[test]
    fn test_leading_digits() {
        assert_eq!(leading_digits("4807.038", 2).unwrap(), 48);
        assert_eq!(leading_digits("01131.000", 3).unwrap(), 11);
        assert!(leading_digits("4", 2).is_err());
    }

    #[test]
    fn test_nonzero_decimal() {
        assert_eq!(nonzero_decimal("022.4", "speed").unwrap(), Some(22.4));
        assert_eq!(nonzero_decimal("0.00", "speed").unwrap(), None);
        assert_eq!(nonzero_decimal("", "speed").unwrap(), None);
        assert!(nonzero_decimal("fast", "speed").is_err());
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer("08", "satellites").unwrap(), 8);
        assert!(integer("", "satellites").is_err());
    }
}
