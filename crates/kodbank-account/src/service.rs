//! The account and session service.
//!
//! [`AccountService`] sequences calls to an [`AuthProvider`] and a
//! [`RecordStore`]:
//!
//! - **register**: create identity → insert profile → sign out
//! - **login**: authenticate → find profile → mint access token row
//! - **check_balance**: current session → find profile → find live token
//! - **logout**: end session (optionally revoke the session's token rows)
//!
//! Each step runs only after the previous one succeeded; nothing is retried.

use std::sync::Arc;

use kodbank_config::TokenPolicy;
use kodbank_core::{Clock, SystemClock, expires_after};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::AccountError;
use crate::model::{
    AccessTokenRecord, Balance, Credentials, LoginOutcome, NewProfile, ProviderSession,
    Registration, TokenQuery, UserProfile,
};
use crate::session::SessionContext;
use crate::traits::{AuthProvider, RecordStore};

/// Account flows over a provider `P` and a record store `S`.
///
/// # Example
///
/// ```
/// use kodbank_account::{
///     AccountService, MemoryAuthProvider, MemoryRecordStore, Registration, ServiceConfig,
///     SessionContext, Credentials,
/// };
///
/// # async fn example() -> Result<(), kodbank_account::AccountError> {
/// let service = AccountService::new(
///     MemoryAuthProvider::new(),
///     MemoryRecordStore::new(),
///     ServiceConfig::default(),
/// );
/// let mut ctx = SessionContext::new();
///
/// service
///     .register(&mut ctx, &Registration::new("john", "john@example.com", "secret1"))
///     .await?;
/// service
///     .login(&mut ctx, &Credentials::new("john@example.com", "secret1"))
///     .await?;
/// let balance = service.check_balance(&mut ctx).await?;
/// assert_eq!(balance.balance, 100_000);
/// # Ok(())
/// # }
/// ```
pub struct AccountService<P: AuthProvider, S: RecordStore> {
    provider: P,
    store: S,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl<P: AuthProvider, S: RecordStore> AccountService<P, S> {
    /// Create a service on the system clock.
    pub fn new(provider: P, store: S, config: ServiceConfig) -> Self {
        Self {
            provider,
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Builder: read time from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get a reference to the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get a reference to the record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the active policy.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Register a new account.
    ///
    /// Creates the provider identity, then the profile with the starting
    /// balance, then ends whatever session the provider opened for the new
    /// identity. The caller is signed out afterwards whether or not the
    /// profile insert succeeded.
    pub async fn register(
        &self,
        ctx: &mut SessionContext,
        registration: &Registration,
    ) -> Result<UserProfile, AccountError> {
        let username = registration.username.trim();
        if username.is_empty() {
            return Err(AccountError::InvalidInput("username is required".into()));
        }
        let email = registration.credentials.email.trim();
        if !is_plausible_email(email) {
            return Err(AccountError::InvalidInput(format!(
                "'{email}' is not a valid email address"
            )));
        }

        let credentials = Credentials::new(email, registration.credentials.password.clone());
        let signup = self.provider.create_identity(&credentials).await?;
        info!(identity = %signup.identity.id, "identity created");

        if let Some(session) = signup.session.clone() {
            ctx.set(session);
        }

        let new_profile = NewProfile {
            user_id: signup.identity.id.clone(),
            username: username.to_string(),
            email: email.to_string(),
            phone: registration.phone.clone(),
            balance: self.config.starting_balance,
            role: self.config.default_role.clone(),
        };
        let inserted = self.store.insert_profile(&new_profile).await;

        if let Err(e) = self.provider.end_session(ctx).await {
            warn!(error = %e, "failed to end sign-up session");
        }

        match inserted {
            Ok(profile) => {
                info!(uid = %profile.uid, username = %profile.username, "profile created");
                Ok(profile)
            }
            Err(err) => {
                warn!(
                    identity = %signup.identity.id,
                    error = %err,
                    "profile insert failed after identity creation"
                );
                if self.config.compensate_failed_registration {
                    match self.provider.delete_identity(&signup.identity).await {
                        Ok(()) => info!(identity = %signup.identity.id, "orphaned identity deleted"),
                        Err(e) => warn!(
                            identity = %signup.identity.id,
                            error = %e,
                            "failed to delete orphaned identity"
                        ),
                    }
                }
                Err(err)
            }
        }
    }

    /// Log in and mint an access token row for the new session.
    ///
    /// An identity without a profile still logs in (no token is minted)
    /// unless `require_profile_on_login` is set.
    pub async fn login(
        &self,
        ctx: &mut SessionContext,
        credentials: &Credentials,
    ) -> Result<LoginOutcome, AccountError> {
        let credentials = Credentials::new(credentials.email.trim(), credentials.password.clone());
        let session = self.provider.authenticate(&credentials).await?;
        debug!(identity = %session.identity.id, "provider session issued");
        ctx.set(session.clone());

        let Some(profile) = self
            .store
            .find_profile_by_identity(&session.identity.id)
            .await?
        else {
            if self.config.require_profile_on_login {
                warn!(identity = %session.identity.id, "login rejected: no profile");
                if let Err(e) = self.provider.end_session(ctx).await {
                    warn!(error = %e, "failed to end session");
                }
                return Err(AccountError::ProfileNotFound);
            }
            warn!(
                identity = %session.identity.id,
                "logged in without a profile; no access token minted"
            );
            return Ok(LoginOutcome {
                session_expires_at: session.expires_at,
                profile: None,
                token: None,
            });
        };

        if self.config.token_policy == TokenPolicy::Replace {
            let removed = self.store.delete_tokens_for_owner(&profile.uid).await?;
            debug!(uid = %profile.uid, removed, "previous access tokens replaced");
        }

        let record = AccessTokenRecord {
            token: session.access_token.clone(),
            owner_id: profile.uid.clone(),
            expiry: self.token_expiry(&session),
        };
        self.store.insert_token(&record).await?;
        info!(uid = %profile.uid, expiry = record.expiry, "access token minted");

        Ok(LoginOutcome {
            session_expires_at: session.expires_at,
            profile: Some(profile),
            token: Some(record),
        })
    }

    /// Reveal the caller's balance after verifying the access token table.
    ///
    /// When no live token row exists the session is ended and
    /// [`AccountError::TokenExpired`] is returned.
    pub async fn check_balance(&self, ctx: &mut SessionContext) -> Result<Balance, AccountError> {
        let (session, profile) = self.resolve(ctx).await?;

        let mut query = TokenQuery::live(&profile.uid, self.clock.now_unix());
        if self.config.bind_token_to_session {
            query = query.with_token(&session.access_token);
        }

        if self.store.find_tokens(&query).await?.is_empty() {
            warn!(uid = %profile.uid, "no live access token; forcing sign-out");
            if let Err(e) = self.provider.end_session(ctx).await {
                warn!(error = %e, "failed to end session");
            }
            return Err(AccountError::TokenExpired);
        }

        debug!(uid = %profile.uid, "access token verified");
        Ok(Balance {
            username: profile.username,
            balance: profile.balance,
        })
    }

    /// The caller's profile.
    pub async fn profile(&self, ctx: &mut SessionContext) -> Result<UserProfile, AccountError> {
        self.resolve(ctx).await.map(|(_, profile)| profile)
    }

    /// Every access token row of the caller's profile, newest expiry first.
    pub async fn tokens(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<Vec<AccessTokenRecord>, AccountError> {
        let (_, profile) = self.resolve(ctx).await?;
        self.store.list_tokens(&profile.uid).await
    }

    /// End the caller's provider session.
    ///
    /// Token rows are left to expire unless `revoke_on_logout` is set.
    pub async fn logout(&self, ctx: &mut SessionContext) -> Result<(), AccountError> {
        let Some(session) = ctx.session().cloned() else {
            debug!("logout without a session");
            return Ok(());
        };

        let ended = self.provider.end_session(ctx).await;

        if self.config.revoke_on_logout {
            let revoked = self.store.delete_token(&session.access_token).await?;
            info!(revoked, "access tokens revoked");
        }

        ended?;
        info!(identity = %session.identity.id, "logged out");
        Ok(())
    }

    /// Delete token rows that expired before now. Returns the count.
    pub async fn prune_expired_tokens(&self) -> Result<u64, AccountError> {
        let removed = self
            .store
            .delete_expired_tokens(self.clock.now_unix())
            .await?;
        info!(removed, "expired access tokens pruned");
        Ok(removed)
    }

    async fn resolve(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<(ProviderSession, UserProfile), AccountError> {
        let session = self
            .provider
            .current_session(ctx)
            .await?
            .ok_or(AccountError::NotAuthenticated)?;
        let profile = self
            .store
            .find_profile_by_identity(&session.identity.id)
            .await?
            .ok_or(AccountError::ProfileNotFound)?;
        Ok((session, profile))
    }

    fn token_expiry(&self, session: &ProviderSession) -> i64 {
        match self.config.token_ttl {
            Some(ttl) => session
                .expires_at
                .min(expires_after(self.clock.now_unix(), ttl)),
            None => session.expires_at,
        }
    }
}

impl<P, S> std::fmt::Debug for AccountService<P, S>
where
    P: AuthProvider + std::fmt::Debug,
    S: RecordStore + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("provider", &self.provider)
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `local@domain` with no whitespace.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use kodbank_core::ManualClock;

    use super::*;
    use crate::memory::{MemoryAuthProvider, MemoryRecordStore};
    use crate::model::Identity;

    fn session(expires_at: i64) -> ProviderSession {
        ProviderSession {
            access_token: "tok".into(),
            refresh_token: None,
            expires_at,
            identity: Identity {
                id: "id".into(),
                email: "a@b.c".into(),
            },
        }
    }

    #[test]
    fn test_plausible_email() {
        assert!(is_plausible_email("john@example.com"));
        assert!(!is_plausible_email("john.example.com"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("john@"));
        assert!(!is_plausible_email("jo hn@example.com"));
        assert!(!is_plausible_email("a@b@c"));
    }

    #[test]
    fn test_token_expiry_follows_session_without_cap() {
        let clock = Arc::new(ManualClock::new(1_000));
        let service = AccountService::new(
            MemoryAuthProvider::new(),
            MemoryRecordStore::new(),
            ServiceConfig::default(),
        )
        .with_clock(clock);
        assert_eq!(service.token_expiry(&session(4_600)), 4_600);
    }

    #[test]
    fn test_token_expiry_cap_is_min() {
        let clock = Arc::new(ManualClock::new(1_000));
        let service = AccountService::new(
            MemoryAuthProvider::new(),
            MemoryRecordStore::new(),
            ServiceConfig::default().token_ttl(Duration::from_secs(60)),
        )
        .with_clock(clock);
        assert_eq!(service.token_expiry(&session(4_600)), 1_060);
        assert_eq!(service.token_expiry(&session(1_030)), 1_030);
    }

    #[test]
    fn test_token_expiry_huge_cap_keeps_session_expiry() {
        let clock = Arc::new(ManualClock::new(1_000));
        for secs in [u64::MAX, i64::MAX as u64] {
            let service = AccountService::new(
                MemoryAuthProvider::new(),
                MemoryRecordStore::new(),
                ServiceConfig::default().token_ttl(Duration::from_secs(secs)),
            )
            .with_clock(clock.clone());
            assert_eq!(service.token_expiry(&session(4_600)), 4_600);
        }
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input_before_provider() {
        let service = AccountService::new(
            MemoryAuthProvider::new(),
            MemoryRecordStore::new(),
            ServiceConfig::default(),
        );
        let mut ctx = SessionContext::new();

        let err = service
            .register(&mut ctx, &Registration::new("  ", "a@b.c", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidInput(_)));

        let err = service
            .register(&mut ctx, &Registration::new("bob", "not-an-email", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::InvalidInput(_)));
        assert_eq!(service.provider().identity_count(), 0);
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop() {
        let service = AccountService::new(
            MemoryAuthProvider::new(),
            MemoryRecordStore::new(),
            ServiceConfig::default().revoke_on_logout(true),
        );
        let mut ctx = SessionContext::new();
        service.logout(&mut ctx).await.unwrap();
    }
}
