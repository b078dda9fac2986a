//! Self-hosted SQL authentication provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kodbank_core::defaults::{DEFAULT_MIN_PASSWORD_LEN, DEFAULT_SESSION_TTL_SECS};
use kodbank_core::{Clock, SystemClock, expires_after};
use sqlx::Row;
use sqlx::any::AnyRow;
use tracing::{debug, info};

use crate::error::AccountError;
use crate::hash::{generate_token, hash_password, token_digest, verify_password};
use crate::model::{Credentials, Identity, ProviderSession, SignUp, normalize_email};
use crate::session::SessionContext;
use crate::traits::AuthProvider;

use super::backend::{SqlDatabase, is_unique_violation};
use super::queries;

/// Authentication provider keeping identities and sessions in SQL tables.
///
/// Passwords are stored as argon2 hashes; access and refresh tokens only as
/// SHA-256 digests. An expired access token is exchanged for a new session
/// through its refresh token, which is single-use.
pub struct SqlAuthProvider {
    db: SqlDatabase,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    min_password_len: usize,
}

/// Internal struct for a session row joined with its identity.
struct SessionRow {
    token_digest: String,
    identity: Identity,
    expires_at: i64,
}

impl SqlAuthProvider {
    /// Create a provider over `db` on the system clock.
    pub fn new(db: SqlDatabase) -> Self {
        Self {
            db,
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

    /// Builder: set session lifetime.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Builder: set minimum password length.
    pub fn min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }

    fn parse_session_row(row: &AnyRow) -> Result<SessionRow, AccountError> {
        Ok(SessionRow {
            token_digest: row.try_get("token_digest")?,
            identity: Identity {
                id: row.try_get("identity_id")?,
                email: row.try_get("email")?,
            },
            expires_at: row.try_get("expires_at")?,
        })
    }

    async fn find_session(
        &self,
        statement: &str,
        digest: &str,
    ) -> Result<Option<SessionRow>, AccountError> {
        sqlx::query(&self.db.sql(statement))
            .bind(digest)
            .fetch_optional(self.db.pool())
            .await?
            .as_ref()
            .map(Self::parse_session_row)
            .transpose()
    }

    async fn delete_session(&self, token_digest: &str) -> Result<u64, AccountError> {
        let result = sqlx::query(&self.db.sql(queries::DELETE_SESSION))
            .bind(token_digest)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn issue_session(&self, identity: Identity) -> Result<ProviderSession, AccountError> {
        let access_token = generate_token();
        let refresh_token = generate_token();
        let expires_at = expires_after(self.clock.now_unix(), self.session_ttl);

        sqlx::query(&self.db.sql(queries::INSERT_SESSION))
            .bind(token_digest(&access_token))
            .bind(token_digest(&refresh_token))
            .bind(&identity.id)
            .bind(expires_at)
            .execute(self.db.pool())
            .await?;

        debug!(identity = %identity.id, expires_at, "session issued");
        Ok(ProviderSession {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at,
            identity,
        })
    }

    /// Exchange a refresh token for a new session, consuming the old one.
    async fn refresh(&self, refresh_token: &str) -> Result<Option<ProviderSession>, AccountError> {
        let Some(row) = self
            .find_session(queries::FIND_SESSION_BY_REFRESH, &token_digest(refresh_token))
            .await?
        else {
            return Ok(None);
        };

        // Lost race: another caller already rotated this refresh token
        if self.delete_session(&row.token_digest).await? == 0 {
            return Ok(None);
        }

        let session = self.issue_session(row.identity).await?;
        info!(identity = %session.identity.id, "session refreshed");
        Ok(Some(session))
    }
}

#[async_trait]
impl AuthProvider for SqlAuthProvider {
    async fn create_identity(&self, credentials: &Credentials) -> Result<SignUp, AccountError> {
        if credentials.password.chars().count() < self.min_password_len {
            return Err(AccountError::WeakCredential(format!(
                "password must be at least {} characters",
                self.min_password_len
            )));
        }

        let email = normalize_email(&credentials.email);
        let existing = sqlx::query(&self.db.sql(queries::FIND_IDENTITY_BY_EMAIL))
            .bind(&email)
            .fetch_optional(self.db.pool())
            .await?;
        if existing.is_some() {
            return Err(AccountError::CredentialConflict);
        }

        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            email,
        };
        let inserted = sqlx::query(&self.db.sql(queries::INSERT_IDENTITY))
            .bind(&identity.id)
            .bind(&identity.email)
            .bind(hash_password(&credentials.password)?)
            .bind(self.clock.now_unix())
            .execute(self.db.pool())
            .await;
        match inserted {
            Ok(_) => {}
            // Unique email index caught a concurrent registration
            Err(e) if is_unique_violation(&e) => return Err(AccountError::CredentialConflict),
            Err(e) => return Err(e.into()),
        }

        let session = self.issue_session(identity.clone()).await?;
        Ok(SignUp {
            identity,
            session: Some(session),
        })
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<ProviderSession, AccountError> {
        let row = sqlx::query(&self.db.sql(queries::FIND_IDENTITY_BY_EMAIL))
            .bind(normalize_email(&credentials.email))
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let password_hash: String = row.try_get("password_hash")?;
        if !verify_password(&credentials.password, &password_hash) {
            return Err(AccountError::InvalidCredentials);
        }

        let identity = Identity {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
        };
        self.issue_session(identity).await
    }

    async fn current_session(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<Option<ProviderSession>, AccountError> {
        let Some(session) = ctx.session().cloned() else {
            return Ok(None);
        };

        let digest = token_digest(&session.access_token);
        let now = self.clock.now_unix();
        let stale = match self.find_session(queries::FIND_SESSION, &digest).await? {
            Some(row) if now < row.expires_at => return Ok(Some(session)),
            Some(_) => true,
            None => false,
        };

        // refresh() consumes the expired row itself
        let refreshed = match session.refresh_token {
            Some(ref refresh_token) => self.refresh(refresh_token).await?,
            None => None,
        };
        match refreshed {
            Some(fresh) => {
                ctx.set(fresh.clone());
                Ok(Some(fresh))
            }
            None => {
                if stale {
                    self.delete_session(&digest).await?;
                }
                ctx.clear();
                Ok(None)
            }
        }
    }

    async fn end_session(&self, ctx: &mut SessionContext) -> Result<(), AccountError> {
        if let Some(session) = ctx.take() {
            self.delete_session(&token_digest(&session.access_token))
                .await?;
        }
        Ok(())
    }

    async fn delete_identity(&self, identity: &Identity) -> Result<(), AccountError> {
        let mut tx = self.db.pool().begin().await?;
        sqlx::query(&self.db.sql(queries::DELETE_SESSIONS_FOR_IDENTITY))
            .bind(&identity.id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query(&self.db.sql(queries::DELETE_IDENTITY))
            .bind(&identity.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(AccountError::backend("identity not found"));
        }
        tx.commit().await?;
        info!(identity = %identity.id, "identity deleted");
        Ok(())
    }
}

// Debug implementation (don't leak credentials)
impl std::fmt::Debug for SqlAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlAuthProvider")
            .field("db", &self.db)
            .field("session_ttl", &self.session_ttl)
            .field("min_password_len", &self.min_password_len)
            .finish_non_exhaustive()
    }
}
