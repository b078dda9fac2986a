//! Collaborator traits: the authentication provider and the record store.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AccountError;
use crate::model::{
    AccessTokenRecord, Credentials, Identity, NewProfile, ProviderSession, SignUp, TokenQuery,
    UserProfile,
};
use crate::session::SessionContext;

/// External service owning credential verification and primary sessions.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create a credential identity.
    ///
    /// # Errors
    /// * `CredentialConflict` - the email is already registered
    /// * `WeakCredential` - the password is rejected
    async fn create_identity(&self, credentials: &Credentials) -> Result<SignUp, AccountError>;

    /// Exchange credentials for a session.
    ///
    /// # Errors
    /// * `InvalidCredentials` - email or password rejected
    async fn authenticate(&self, credentials: &Credentials)
    -> Result<ProviderSession, AccountError>;

    /// The context's session if it is still valid.
    ///
    /// Implementations may refresh the session in place. A session that is
    /// no longer valid is removed from `ctx` and `Ok(None)` is returned.
    async fn current_session(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<Option<ProviderSession>, AccountError>;

    /// End the context's session. The context is cleared even if the
    /// provider call fails. A signed-out context is a no-op.
    async fn end_session(&self, ctx: &mut SessionContext) -> Result<(), AccountError>;

    /// Optional: delete an identity.
    ///
    /// Default implementation reports `Unsupported`.
    #[inline]
    async fn delete_identity(&self, _identity: &Identity) -> Result<(), AccountError> {
        Err(AccountError::Unsupported("delete_identity"))
    }
}

/// External service owning profile and token rows.
///
/// Return `Ok(None)` / empty collections for "no rows"; errors are reserved
/// for failures of the store itself.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a profile and return it with its assigned `uid`.
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, AccountError>;

    /// Look up the profile owned by a provider identity.
    async fn find_profile_by_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<UserProfile>, AccountError>;

    /// Insert a token row. No uniqueness is enforced.
    async fn insert_token(&self, record: &AccessTokenRecord) -> Result<(), AccountError>;

    /// Token rows matching `query`, at most `query.limit`.
    async fn find_tokens(&self, query: &TokenQuery)
    -> Result<Vec<AccessTokenRecord>, AccountError>;

    /// Every token row of an owner, newest expiry first.
    async fn list_tokens(&self, owner_id: &str) -> Result<Vec<AccessTokenRecord>, AccountError>;

    /// Delete every token row of an owner. Returns the number of rows removed.
    async fn delete_tokens_for_owner(&self, owner_id: &str) -> Result<u64, AccountError>;

    /// Delete the rows carrying `token`. Returns the number of rows removed.
    async fn delete_token(&self, token: &str) -> Result<u64, AccountError>;

    /// Delete rows with `expiry < now`. Returns the number of rows removed.
    async fn delete_expired_tokens(&self, now: i64) -> Result<u64, AccountError>;
}

/// Blanket implementation for `Arc<P>` where `P: AuthProvider`.
#[async_trait]
impl<P: AuthProvider + ?Sized> AuthProvider for Arc<P> {
    #[inline]
    async fn create_identity(&self, credentials: &Credentials) -> Result<SignUp, AccountError> {
        (**self).create_identity(credentials).await
    }

    #[inline]
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<ProviderSession, AccountError> {
        (**self).authenticate(credentials).await
    }

    #[inline]
    async fn current_session(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<Option<ProviderSession>, AccountError> {
        (**self).current_session(ctx).await
    }

    #[inline]
    async fn end_session(&self, ctx: &mut SessionContext) -> Result<(), AccountError> {
        (**self).end_session(ctx).await
    }

    #[inline]
    async fn delete_identity(&self, identity: &Identity) -> Result<(), AccountError> {
        (**self).delete_identity(identity).await
    }
}

/// Blanket implementation for `Box<P>` where `P: AuthProvider`.
#[async_trait]
impl<P: AuthProvider + ?Sized> AuthProvider for Box<P> {
    #[inline]
    async fn create_identity(&self, credentials: &Credentials) -> Result<SignUp, AccountError> {
        (**self).create_identity(credentials).await
    }

    #[inline]
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<ProviderSession, AccountError> {
        (**self).authenticate(credentials).await
    }

    #[inline]
    async fn current_session(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<Option<ProviderSession>, AccountError> {
        (**self).current_session(ctx).await
    }

    #[inline]
    async fn end_session(&self, ctx: &mut SessionContext) -> Result<(), AccountError> {
        (**self).end_session(ctx).await
    }

    #[inline]
    async fn delete_identity(&self, identity: &Identity) -> Result<(), AccountError> {
        (**self).delete_identity(identity).await
    }
}

/// Blanket implementation for `Arc<S>` where `S: RecordStore`.
#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    #[inline]
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, AccountError> {
        (**self).insert_profile(profile).await
    }

    #[inline]
    async fn find_profile_by_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<UserProfile>, AccountError> {
        (**self).find_profile_by_identity(identity_id).await
    }

    #[inline]
    async fn insert_token(&self, record: &AccessTokenRecord) -> Result<(), AccountError> {
        (**self).insert_token(record).await
    }

    #[inline]
    async fn find_tokens(
        &self,
        query: &TokenQuery,
    ) -> Result<Vec<AccessTokenRecord>, AccountError> {
        (**self).find_tokens(query).await
    }

    #[inline]
    async fn list_tokens(&self, owner_id: &str) -> Result<Vec<AccessTokenRecord>, AccountError> {
        (**self).list_tokens(owner_id).await
    }

    #[inline]
    async fn delete_tokens_for_owner(&self, owner_id: &str) -> Result<u64, AccountError> {
        (**self).delete_tokens_for_owner(owner_id).await
    }

    #[inline]
    async fn delete_token(&self, token: &str) -> Result<u64, AccountError> {
        (**self).delete_token(token).await
    }

    #[inline]
    async fn delete_expired_tokens(&self, now: i64) -> Result<u64, AccountError> {
        (**self).delete_expired_tokens(now).await
    }
}

/// Blanket implementation for `Box<S>` where `S: RecordStore`.
#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    #[inline]
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, AccountError> {
        (**self).insert_profile(profile).await
    }

    #[inline]
    async fn find_profile_by_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<UserProfile>, AccountError> {
        (**self).find_profile_by_identity(identity_id).await
    }

    #[inline]
    async fn insert_token(&self, record: &AccessTokenRecord) -> Result<(), AccountError> {
        (**self).insert_token(record).await
    }

    #[inline]
    async fn find_tokens(
        &self,
        query: &TokenQuery,
    ) -> Result<Vec<AccessTokenRecord>, AccountError> {
        (**self).find_tokens(query).await
    }

    #[inline]
    async fn list_tokens(&self, owner_id: &str) -> Result<Vec<AccessTokenRecord>, AccountError> {
        (**self).list_tokens(owner_id).await
    }

    #[inline]
    async fn delete_tokens_for_owner(&self, owner_id: &str) -> Result<u64, AccountError> {
        (**self).delete_tokens_for_owner(owner_id).await
    }

    #[inline]
    async fn delete_token(&self, token: &str) -> Result<u64, AccountError> {
        (**self).delete_token(token).await
    }

    #[inline]
    async fn delete_expired_tokens(&self, now: i64) -> Result<u64, AccountError> {
        (**self).delete_expired_tokens(now).await
    }
}
