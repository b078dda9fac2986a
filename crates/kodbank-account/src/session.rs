//! Explicit client session context.

use serde::{Deserialize, Serialize};

use crate::model::ProviderSession;

/// The caller's provider session, passed into every account operation.
///
/// This is the state a browser client would keep in local storage. It is
/// serializable so the CLI can persist it between invocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    session: Option<ProviderSession>,
}

impl SessionContext {
    /// A signed-out context.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context holding `session`.
    pub fn with_session(session: ProviderSession) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// The held session, without any validity check.
    #[inline]
    pub fn session(&self) -> Option<&ProviderSession> {
        self.session.as_ref()
    }

    /// Replace the held session.
    #[inline]
    pub fn set(&mut self, session: ProviderSession) {
        self.session = Some(session);
    }

    /// Remove and return the held session.
    #[inline]
    pub fn take(&mut self) -> Option<ProviderSession> {
        self.session.take()
    }

    /// Drop the held session.
    #[inline]
    pub fn clear(&mut self) {
        self.session = None;
    }

    /// Whether a session is held (it may still be expired or revoked).
    #[inline]
    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}
