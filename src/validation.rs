//! Form-boundary validation for the account and settings screens.
//!
//! These checks run before anything is sent to the backend. A failed check is
//! reported as a [`ValidationError`] and never reaches the network.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 100;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,

    #[error("Name must be less than 100 characters")]
    NameTooLong,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Email must be less than 255 characters")]
    EmailTooLong,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Password must be less than 100 characters")]
    PasswordTooLong,

    #[error("Passwords don't match")]
    PasswordMismatch,
}

/// Returns the trimmed name.
pub fn validate_full_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    Ok(name.to_string())
}

/// Returns the trimmed address.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ValidationError::EmailTooLong);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_string())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

/// Password change form: the new password plus its confirmation.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    validate_password(password)?;
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
