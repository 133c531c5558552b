//! User input validation

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").ok());

/// Checks an address against the accepted shape: `local@domain.tld`.
///
/// Surrounding whitespace is ignored.
pub fn is_valid_email(input: &str) -> bool {
    match EMAIL_RE.as_ref() {
        Some(re) => re.is_match(input.trim()),
        None => false,
    }
}

/// Returns the trimmed address or a validation error.
pub fn validate_email(input: &str) -> AppResult<String> {
    let trimmed = input.trim();
    if is_valid_email(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(AppError::Validation(format!("invalid email address: {:?}", trimmed)))
    }
}
