use crate::api::errors::ApiError;
use crate::schemas::user::{Role, User};
use crate::session::AuthSession;

/// Route-guard checks run before a screen's work starts. Admins pass every
/// role gate, matching the server's permission model.
pub(crate) fn require_authenticated(session: &AuthSession) -> Result<User, ApiError> {
    session.current().ok_or(ApiError::Unauthorized)
}

pub(crate) fn require_role(session: &AuthSession, role: Role) -> Result<User, ApiError> {
    let user = require_authenticated(session)?;
    if user.role == role || user.role == Role::Admin {
        return Ok(user);
    }
    Err(ApiError::Forbidden(format!("{} access required", role.as_str())))
}
