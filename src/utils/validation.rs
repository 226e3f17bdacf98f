//! Input validation primitives.
//!
//! Replace verbose `ok_or_else` + `Error::validation_*` chains at call sites.

use regex::Regex;

use crate::error::{Error, Result};

/// Require an Option to contain a value, reporting the missing argument by name.
pub fn require<T>(opt: Option<T>, field: &str) -> Result<T> {
    opt.ok_or_else(|| Error::validation_missing_argument(vec![field.to_string()]))
}

/// Require a string to be non-empty after trimming.
///
/// Returns a reference to the trimmed string on success.
pub fn require_non_empty<'a>(value: &'a str, field: &str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation_invalid_argument(field, message, None))
    } else {
        Ok(trimmed)
    }
}

/// Require a string to match a regex in full.
pub fn require_match(value: &str, pattern: &Regex, field: &str, message: &str) -> Result<()> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(Error::validation_invalid_argument(
            field,
            message,
            Some(value.to_string()),
        ))
    }
}

/// Require a TCP port in 1..=65535.
pub fn require_port(port: u32, field: &str) -> Result<u16> {
    match u16::try_from(port) {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(Error::validation_invalid_argument(
            field,
            "Port must be between 1 and 65535",
            Some(port.to_string()),
        )),
    }
}
