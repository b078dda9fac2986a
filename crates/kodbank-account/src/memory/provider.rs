//! In-memory authentication provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kodbank_core::defaults::{DEFAULT_MIN_PASSWORD_LEN, DEFAULT_SESSION_TTL_SECS};
use kodbank_core::{Clock, SystemClock, expires_after};
use parking_lot::RwLock;

use crate::error::AccountError;
use crate::hash::{generate_token, hash_password, token_digest, verify_password};
use crate::model::{Credentials, Identity, ProviderSession, SignUp, normalize_email};
use crate::session::SessionContext;
use crate::traits::AuthProvider;

#[derive(Debug)]
struct StoredIdentity {
    identity: Identity,
    password_hash: String,
}

#[derive(Debug)]
struct StoredSession {
    identity_id: String,
    expires_at: i64,
}

#[derive(Debug, Default)]
struct ProviderState {
    /// Normalized email → identity.
    identities: HashMap<String, StoredIdentity>,
    /// Access token digest → session.
    sessions: HashMap<String, StoredSession>,
}

/// Authentication provider holding identities and sessions in memory.
///
/// Like a hosted provider with email confirmation disabled, creating an
/// identity also signs it in.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use kodbank_account::MemoryAuthProvider;
///
/// let provider = MemoryAuthProvider::new().session_ttl(Duration::from_secs(600));
/// assert_eq!(provider.identity_count(), 0);
/// ```
pub struct MemoryAuthProvider {
    state: RwLock<ProviderState>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    min_password_len: usize,
}

impl MemoryAuthProvider {
    /// Create an empty provider on the system clock.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ProviderState::default()),
            clock: Arc::new(SystemClock),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }

    /// Builder: read time from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builder: set the session lifetime.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Builder: set the minimum password length.
    pub fn min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }

    /// Number of registered identities.
    pub fn identity_count(&self) -> usize {
        self.state.read().identities.len()
    }

    /// Number of sessions that have not ended or expired.
    pub fn active_sessions(&self) -> usize {
        let now = self.clock.now_unix();
        self.state
            .read()
            .sessions
            .values()
            .filter(|s| now < s.expires_at)
            .count()
    }

    fn issue_session(&self, identity: &Identity) -> ProviderSession {
        let access_token = generate_token();
        let expires_at = expires_after(self.clock.now_unix(), self.session_ttl);

        self.state.write().sessions.insert(
            token_digest(&access_token),
            StoredSession {
                identity_id: identity.id.clone(),
                expires_at,
            },
        );

        ProviderSession {
            access_token,
            refresh_token: None,
            expires_at,
            identity: identity.clone(),
        }
    }
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Cannot derive Debug due to dyn Clock
impl std::fmt::Debug for MemoryAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAuthProvider")
            .field("session_ttl", &self.session_ttl)
            .field("min_password_len", &self.min_password_len)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn create_identity(&self, credentials: &Credentials) -> Result<SignUp, AccountError> {
        if credentials.password.chars().count() < self.min_password_len {
            return Err(AccountError::WeakCredential(format!(
                "password must be at least {} characters",
                self.min_password_len
            )));
        }

        let email = normalize_email(&credentials.email);
        if self.state.read().identities.contains_key(&email) {
            return Err(AccountError::CredentialConflict);
        }

        // Hash outside the lock
        let password_hash = hash_password(&credentials.password)?;
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
        };

        {
            let mut state = self.state.write();
            // Re-check: another registration may have won the race
            if state.identities.contains_key(&email) {
                return Err(AccountError::CredentialConflict);
            }
            state.identities.insert(
                email,
                StoredIdentity {
                    identity: identity.clone(),
                    password_hash,
                },
            );
        }

        let session = self.issue_session(&identity);
        Ok(SignUp {
            identity,
            session: Some(session),
        })
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<ProviderSession, AccountError> {
        let email = normalize_email(&credentials.email);
        let (identity, password_hash) = {
            let state = self.state.read();
            let stored = state
                .identities
                .get(&email)
                .ok_or(AccountError::InvalidCredentials)?;
            (stored.identity.clone(), stored.password_hash.clone())
        };

        if !verify_password(&credentials.password, &password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        Ok(self.issue_session(&identity))
    }

    async fn current_session(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<Option<ProviderSession>, AccountError> {
        let Some(session) = ctx.session() else {
            return Ok(None);
        };

        let digest = token_digest(&session.access_token);
        let now = self.clock.now_unix();
        let valid = {
            let mut state = self.state.write();
            match state.sessions.get(&digest) {
                Some(stored) if now < stored.expires_at => true,
                Some(_) => {
                    state.sessions.remove(&digest);
                    false
                }
                None => false,
            }
        };

        if valid {
            Ok(ctx.session().cloned())
        } else {
            ctx.clear();
            Ok(None)
        }
    }

    async fn end_session(&self, ctx: &mut SessionContext) -> Result<(), AccountError> {
        if let Some(session) = ctx.take() {
            self.state
                .write()
                .sessions
                .remove(&token_digest(&session.access_token));
        }
        Ok(())
    }

    async fn delete_identity(&self, identity: &Identity) -> Result<(), AccountError> {
        let mut state = self.state.write();
        let removed = state
            .identities
            .remove(&normalize_email(&identity.email))
            .is_some();
        if !removed {
            return Err(AccountError::backend("identity not found"));
        }
        state.sessions.retain(|_, s| s.identity_id != identity.id);
        Ok(())
    }
}
