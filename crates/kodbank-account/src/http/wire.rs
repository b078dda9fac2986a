//! Wire types of the GoTrue and PostgREST APIs and their conversions.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::AccountError;
use crate::model::{AccessTokenRecord, Identity, NewProfile, ProviderSession, Role, UserProfile};

// ── GoTrue ────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Empty for an already-registered email when enumeration protection
    /// is on.
    #[serde(default)]
    pub identities: Option<Vec<serde_json::Value>>,
}

impl User {
    pub fn into_identity(self, fallback_email: &str) -> Identity {
        Identity {
            id: self.id,
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
        }
    }
}

/// Token grant answer.
#[derive(Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

impl Session {
    /// `now` resolves `expires_in` when `expires_at` is absent.
    pub fn into_provider_session(self, now: i64, fallback_email: &str) -> ProviderSession {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now.saturating_add(self.expires_in.unwrap_or(0)));
        ProviderSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            identity: self.user.into_identity(fallback_email),
        }
    }
}

/// Sign-up answer: a session when the project auto-confirms emails,
/// otherwise the bare user.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(Session),
    User(User),
}

/// GoTrue and PostgREST error bodies, old and new shapes.
#[derive(Debug, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
    }
}

/// Map a non-2xx answer onto the error taxonomy.
pub fn map_error(status: u16, body: &str) -> AccountError {
    let err: ApiError = serde_json::from_str(body).unwrap_or_default();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    match err.error_code.as_deref() {
        Some("user_already_exists" | "email_exists") => return AccountError::CredentialConflict,
        Some("weak_password") => return AccountError::WeakCredential(message),
        Some("invalid_credentials") => return AccountError::InvalidCredentials,
        _ => {}
    }
    if err.error.as_deref() == Some("invalid_grant") {
        return AccountError::InvalidCredentials;
    }

    if message.is_empty() {
        AccountError::Backend(format!("HTTP {status}"))
    } else {
        AccountError::Backend(format!("HTTP {status}: {message}"))
    }
}

// ── PostgREST ─────────────────────────────────────────────────────

/// `kod_users` insert body; `uid` is assigned by the table default.
#[derive(Serialize)]
pub struct ProfileInsert<'a> {
    pub user_id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub balance: i64,
    pub role: &'a str,
}

impl<'a> From<&'a NewProfile> for ProfileInsert<'a> {
    fn from(p: &'a NewProfile) -> Self {
        Self {
            user_id: &p.user_id,
            username: &p.username,
            email: &p.email,
            phone: p.phone.as_deref(),
            balance: p.balance,
            role: p.role.as_str(),
        }
    }
}

#[derive(Deserialize)]
pub struct ProfileRow {
    pub uid: String,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub balance: i64,
    #[serde(default)]
    pub role: Option<String>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            uid: row.uid,
            user_id: row.user_id,
            username: row.username,
            email: row.email.unwrap_or_default(),
            phone: row.phone,
            balance: row.balance,
            role: row.role.map(Role::from).unwrap_or(Role::Customer),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct TokenRow {
    pub token: String,
    pub uid: String,
    /// RFC 3339 timestamp.
    pub expiry: String,
}

impl TokenRow {
    pub fn from_record(record: &AccessTokenRecord) -> Result<Self, AccountError> {
        Ok(Self {
            token: record.token.clone(),
            uid: record.owner_id.clone(),
            expiry: format_timestamp(record.expiry)?,
        })
    }

    pub fn into_record(self) -> Result<AccessTokenRecord, AccountError> {
        Ok(AccessTokenRecord {
            expiry: parse_timestamp(&self.expiry)?,
            token: self.token,
            owner_id: self.uid,
        })
    }
}

/// Unix seconds → RFC 3339 (UTC).
pub fn format_timestamp(unix: i64) -> Result<String, AccountError> {
    OffsetDateTime::from_unix_timestamp(unix)
        .map_err(AccountError::backend)?
        .format(&Rfc3339)
        .map_err(AccountError::backend)
}

/// RFC 3339 → Unix seconds.
pub fn parse_timestamp(value: &str) -> Result<i64, AccountError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(OffsetDateTime::unix_timestamp)
        .map_err(AccountError::backend)
}
