//! Records exchanged with the authentication provider and the record store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a profile. Only `Customer` is ever assigned by registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Customer,
    Admin,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Customer => "Customer",
            Self::Admin => "Admin",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Customer" => Self::Customer,
            "Admin" => Self::Admin,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Store-generated id (UUID v4).
    pub uid: String,
    /// Provider identity id this profile belongs to.
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    /// Minor currency units.
    pub balance: i64,
    pub role: Role,
}

/// Insert shape of a [`UserProfile`]; the store assigns `uid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub balance: i64,
    pub role: Role,
}

impl NewProfile {
    /// Attach a store-assigned id.
    pub fn into_profile(self, uid: impl Into<String>) -> UserProfile {
        UserProfile {
            uid: uid.into(),
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            phone: self.phone,
            balance: self.balance,
            role: self.role,
        }
    }
}

/// Secondary access token row shadowing a provider session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenRecord {
    /// Equal to the provider session's access token.
    pub token: String,
    /// Owning profile `uid`.
    pub owner_id: String,
    /// Unix seconds.
    pub expiry: i64,
}

impl AccessTokenRecord {
    /// Live at `now` (inclusive, matching the `expiry >= now` lookup).
    #[inline]
    pub fn is_live(&self, now: i64) -> bool {
        self.expiry >= now
    }
}

impl fmt::Debug for AccessTokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenRecord")
            .field("token", &redact(&self.token))
            .field("owner_id", &self.owner_id)
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Filter for token lookups: `owner = ? AND expiry >= ? [AND token = ?] LIMIT ?`.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenQuery {
    pub owner_id: String,
    pub not_expired_at: i64,
    pub token: Option<String>,
    pub limit: usize,
}

impl TokenQuery {
    /// Live tokens of `owner_id` at `now`, at most one.
    pub fn live(owner_id: impl Into<String>, now: i64) -> Self {
        Self {
            owner_id: owner_id.into(),
            not_expired_at: now,
            token: None,
            limit: 1,
        }
    }

    /// Builder: also require an exact token value.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builder: set the row limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `record` satisfies this filter.
    pub fn matches(&self, record: &AccessTokenRecord) -> bool {
        record.owner_id == self.owner_id
            && record.expiry >= self.not_expired_at
            && self.token.as_deref().is_none_or(|t| t == record.token)
    }
}

impl fmt::Debug for TokenQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenQuery")
            .field("owner_id", &self.owner_id)
            .field("not_expired_at", &self.not_expired_at)
            .field("token", &self.token.as_deref().map(redact))
            .field("limit", &self.limit)
            .finish()
    }
}

/// Email and password pair.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Debug implementation (don't leak the password)
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// The provider's user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// A primary session issued by the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    pub expires_at: i64,
    pub identity: Identity,
}

impl ProviderSession {
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSession")
            .field("access_token", &redact(&self.access_token))
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Result of creating an identity.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub identity: Identity,
    /// Present when the provider signs the new identity in immediately.
    pub session: Option<ProviderSession>,
}

/// Registration form.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub credentials: Credentials,
    pub phone: Option<String>,
}

impl Registration {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            credentials: Credentials::new(email, password),
            phone: None,
        }
    }

    /// Builder: set the phone number. Blank input is treated as absent.
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        let phone = phone.into();
        self.phone = if phone.trim().is_empty() {
            None
        } else {
            Some(phone.trim().to_string())
        };
        self
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_expires_at: i64,
    /// `None` when the identity has no profile (login still succeeds).
    pub profile: Option<UserProfile>,
    /// The minted token row; `None` exactly when `profile` is `None`.
    pub token: Option<AccessTokenRecord>,
}

/// Revealed balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    pub username: String,
    /// Minor currency units.
    pub balance: i64,
}

/// Canonical form of an email address for identity lookups.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Short, log-safe prefix of a secret token.
pub(crate) fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_mapping() {
        assert_eq!(Role::from("Customer"), Role::Customer);
        assert_eq!(Role::from("Admin"), Role::Admin);
        assert_eq!(Role::from("Teller"), Role::Other("Teller".into()));
        assert_eq!(String::from(Role::Other("Teller".into())), "Teller");
        assert_eq!(Role::Customer.to_string(), "Customer");

        let json = serde_json::to_string(&Role::Customer).unwrap();
        assert_eq!(json, "\"Customer\"");
    }

    #[test]
    fn test_token_query_matches() {
        let record = AccessTokenRecord {
            token: "tok-a".into(),
            owner_id: "u1".into(),
            expiry: 100,
        };

        assert!(TokenQuery::live("u1", 100).matches(&record));
        assert!(!TokenQuery::live("u1", 101).matches(&record));
        assert!(!TokenQuery::live("u2", 0).matches(&record));
        assert!(TokenQuery::live("u1", 0).with_token("tok-a").matches(&record));
        assert!(!TokenQuery::live("u1", 0).with_token("tok-b").matches(&record));
    }

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let creds = Credentials::new("a@b.c", "hunter22");
        assert!(!format!("{creds:?}").contains("hunter22"));

        let session = ProviderSession {
            access_token: "abcdef0123456789".into(),
            refresh_token: Some("refresh-secret".into()),
            expires_at: 10,
            identity: Identity {
                id: "id".into(),
                email: "a@b.c".into(),
            },
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("0123456789"));
        assert!(!debug.contains("refresh-secret"));
    }

    #[test]
    fn test_registration_blank_phone_is_none() {
        let reg = Registration::new("bob", "bob@example.com", "secret1").phone("   ");
        assert_eq!(reg.phone, None);
        let reg = reg.phone(" +1234 ");
        assert_eq!(reg.phone.as_deref(), Some("+1234"));
    }
}
