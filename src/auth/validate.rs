//! Credential rules. These play the part of the identity provider's
//! checks; their codes surface as field errors on the person forms.

use crate::forms::errors::ErrorCode;

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const EMAIL_MAX: usize = 254;

/// Validate a username: 2-50 chars, alphanumeric and underscore only.
pub fn validate_username(username: &str) -> Option<ErrorCode> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Some(ErrorCode::Required);
    }
    let len = trimmed.chars().count();
    if len < USERNAME_MIN {
        return Some(ErrorCode::TooShort(USERNAME_MIN));
    }
    if len > USERNAME_MAX {
        return Some(ErrorCode::TooLong(USERNAME_MAX));
    }
    if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Some(ErrorCode::InvalidUsername);
    }
    None
}

/// Validate an email: must contain '@' with a dotted domain, max 254 chars.
pub fn validate_email(email: &str) -> Option<ErrorCode> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some(ErrorCode::Required);
    }
    if trimmed.len() > EMAIL_MAX {
        return Some(ErrorCode::TooLong(EMAIL_MAX));
    }
    match trimmed.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') =>
        {
            None
        }
        _ => Some(ErrorCode::InvalidEmail),
    }
}

/// Validate a password: min 8 chars.
pub fn validate_password(password: &str) -> Option<ErrorCode> {
    if password.is_empty() {
        return Some(ErrorCode::Required);
    }
    if password.chars().count() < PASSWORD_MIN {
        return Some(ErrorCode::PasswordTooShort(PASSWORD_MIN));
    }
    None
}
