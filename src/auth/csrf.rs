//! Synchronizer-token CSRF protection for every state-changing form.
//!
//! One token per session, rendered into each form as `csrf_token` and
//! compared on submit. Login and logout forms use it too.

use actix_session::Session;
use rand::Rng;

use crate::errors::AppError;

const TOKEN_KEY: &str = "csrf_token";
const TOKEN_BYTES: usize = 32;

fn stored_token(session: &Session) -> Option<String> {
    session
        .get::<String>(TOKEN_KEY)
        .ok()
        .flatten()
        .filter(|t| !t.is_empty())
}

/// The session's token, minted on first use.
pub fn get_or_create_token(session: &Session) -> String {
    if let Some(token) = stored_token(session) {
        return token;
    }
    let token = new_token();
    if let Err(e) = session.insert(TOKEN_KEY, &token) {
        log::warn!("Could not store CSRF token: {e}");
    }
    token
}

/// Reject the request unless `submitted` equals the session's token.
pub fn validate_csrf(session: &Session, submitted: &str) -> Result<(), AppError> {
    match stored_token(session) {
        Some(stored) if same_bytes(stored.as_bytes(), submitted.as_bytes()) => Ok(()),
        _ => Err(AppError::Csrf),
    }
}

fn new_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

// Length leaks, content does not.
fn same_bytes(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tokens_are_hex_and_unique() {
        let a = new_token();
        let b = new_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn comparison_requires_exact_match() {
        assert!(same_bytes(b"abc123", b"abc123"));
        assert!(!same_bytes(b"abc123", b"abc124"));
        assert!(!same_bytes(b"abc123", b"abc12"));
        assert!(same_bytes(b"", b""));
    }
}
