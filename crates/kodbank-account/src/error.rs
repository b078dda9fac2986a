//! Account flow error types.

/// Errors surfaced by the account flows and their collaborators.
///
/// The first six variants are the user-facing taxonomy; every one of them is
/// shown to the end user as-is and none is retried.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// The email is already registered with the provider.
    #[error("an account with this email already exists")]
    CredentialConflict,

    /// The provider rejected the password as too weak.
    #[error("weak password: {0}")]
    WeakCredential(String),

    /// Email or password rejected at login.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// No live provider session; the caller must log in.
    #[error("not authenticated, please log in")]
    NotAuthenticated,

    /// The provider identity has no profile row.
    #[error("user profile not found")]
    ProfileNotFound,

    /// No unexpired access token row; the session has been ended.
    #[error("access token expired or invalid, please log in again")]
    TokenExpired,

    /// Malformed input rejected before any backend call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backend does not implement this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Backend error (database, network, etc.).
    #[error("backend error: {0}")]
    Backend(String),
}

impl AccountError {
    /// Create a backend error from any error type.
    #[inline]
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }

    /// Whether this error ends the caller's session.
    #[inline]
    pub fn forces_logout(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }
}

#[cfg(feature = "sql")]
impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        Self::backend(err)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AccountError {
    fn from(err: reqwest::Error) -> Self {
        Self::backend(err)
    }
}
