//! Typed access to the cookie session. Every key the app stores lives here.

use actix_session::Session;
use serde::de::DeserializeOwned;

use crate::auth::role::{Role, Viewer};
use crate::errors::AppError;

const USER_ID: &str = "user_id";
const USERNAME: &str = "username";
const ROLE: &str = "role";
const PERMISSIONS: &str = "permissions";
const FLASH: &str = "flash";

/// Permission codes granted to the signed-in role. Askama templates call
/// `has()` on it directly.
#[derive(Debug, Clone, Default)]
pub struct Permissions(pub Vec<String>);

impl Permissions {
    pub fn has(&self, code: &str) -> bool {
        self.0.iter().any(|p| p == code)
    }

    /// Parse the comma-joined form stored in the cookie.
    pub fn from_csv(csv: &str) -> Self {
        Permissions(
            csv.split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn to_csv(&self) -> String {
        self.0.join(",")
    }
}

/// Read `key`, treating a value that fails to deserialize as absent.
fn read<T: DeserializeOwned>(session: &Session, key: &str) -> Option<T> {
    session.get::<T>(key).unwrap_or_else(|e| {
        log::debug!("Unreadable session value '{key}': {e}");
        None
    })
}

/// Read `key` or fail with a session error, which redirects to /login.
fn require<T: DeserializeOwned>(session: &Session, key: &str) -> Result<T, AppError> {
    read(session, key).ok_or_else(|| AppError::Session(format!("No {key} in session")))
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    read(session, USER_ID)
}

/// The stored role, if it names one we know.
pub fn get_role(session: &Session) -> Option<Role> {
    read::<String>(session, ROLE).and_then(|r| Role::parse(&r))
}

pub fn get_username(session: &Session) -> Result<String, AppError> {
    require(session, USERNAME)
}

pub fn get_permissions(session: &Session) -> Result<Permissions, AppError> {
    require::<String>(session, PERMISSIONS).map(|csv| Permissions::from_csv(&csv))
}

pub fn get_viewer(session: &Session) -> Result<Viewer, AppError> {
    let user_id = require(session, USER_ID)?;
    let role = get_role(session).ok_or_else(|| AppError::Session("Unknown role in session".to_string()))?;
    Ok(Viewer::new(user_id, role))
}

/// Start a fresh session for the user. The old session id is discarded.
pub fn sign_in(
    session: &Session,
    user_id: i64,
    username: &str,
    role: Role,
    permissions: &Permissions,
) -> Result<(), AppError> {
    session.renew();
    let stored = session
        .insert(USER_ID, user_id)
        .and_then(|_| session.insert(USERNAME, username))
        .and_then(|_| session.insert(ROLE, role.as_str()))
        .and_then(|_| session.insert(PERMISSIONS, permissions.to_csv()));
    stored.map_err(|e| AppError::Session(e.to_string()))
}

pub fn set_flash(session: &Session, message: &str) {
    if let Err(e) = session.insert(FLASH, message) {
        log::warn!("Could not store flash message: {e}");
    }
}

/// One-shot: the message is removed once read.
pub fn take_flash(session: &Session) -> Option<String> {
    session.remove_as::<String>(FLASH).and_then(Result::ok)
}

pub fn require_permission(session: &Session, code: &str) -> Result<(), AppError> {
    if get_permissions(session)?.has(code) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(code.to_string()))
    }
}
