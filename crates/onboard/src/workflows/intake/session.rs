use crate::config::AdminCredentials;

use super::validate::FieldErrors;

/// Per-request session context passed explicitly through the access-control
/// layer. There is deliberately no process-wide login singleton.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub authenticated: bool,
    flash: Vec<String>,
    field_errors: Option<FieldErrors>,
}

impl SessionContext {
    /// Queue a one-shot notice for the next rendered page.
    pub fn push_flash(&mut self, message: impl Into<String>) {
        self.flash.push(message.into());
    }

    /// Drain queued flash messages.
    pub fn take_flash(&mut self) -> Vec<String> {
        std::mem::take(&mut self.flash)
    }

    /// Preserve the full per-field error map so the next form render can
    /// show field-level detail rather than a single generic notice.
    pub fn remember_errors(&mut self, errors: FieldErrors) {
        self.field_errors = Some(errors);
    }

    pub fn take_field_errors(&mut self) -> Option<FieldErrors> {
        self.field_errors.take()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Please login first.")]
    Unauthenticated,
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Gate for admin-only operations.
pub fn require_admin(session: &SessionContext) -> Result<(), AccessError> {
    if session.authenticated {
        Ok(())
    } else {
        Err(AccessError::Unauthenticated)
    }
}

/// Grant the session flag iff both credentials match the injected
/// configuration.
pub fn login(
    session: &mut SessionContext,
    credentials: &AdminCredentials,
    username: &str,
    password: &str,
) -> Result<(), AccessError> {
    if credentials.verify(username, password) {
        session.authenticated = true;
        Ok(())
    } else {
        Err(AccessError::InvalidCredentials)
    }
}

/// Clear all session state unconditionally.
pub fn logout(session: &mut SessionContext) {
    *session = SessionContext::default();
}
