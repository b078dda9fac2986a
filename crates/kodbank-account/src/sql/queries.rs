//! SQL statements.
//!
//! Statements use `?` placeholders; [`SqlDatabase::sql`](super::SqlDatabase)
//! rewrites them to `$n` for PostgreSQL.

// ============================================================================
// Schema
// ============================================================================

/// Schema for PostgreSQL and SQLite.
pub const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS kod_users (
    uid VARCHAR(36) PRIMARY KEY,
    user_id VARCHAR(64) NOT NULL,
    username VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL,
    phone VARCHAR(64),
    balance BIGINT NOT NULL,
    role VARCHAR(64) NOT NULL,
    created_at BIGINT NOT NULL
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_kod_users_user_id ON kod_users(user_id)",
    r#"
CREATE TABLE IF NOT EXISTS user_tokens (
    id VARCHAR(36) PRIMARY KEY,
    token TEXT NOT NULL,
    uid VARCHAR(36) NOT NULL,
    expiry BIGINT NOT NULL
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_user_tokens_uid ON user_tokens(uid)",
    r#"
CREATE TABLE IF NOT EXISTS auth_identities (
    id VARCHAR(36) PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at BIGINT NOT NULL
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS auth_sessions (
    token_digest CHAR(64) PRIMARY KEY,
    refresh_digest CHAR(64) NOT NULL,
    identity_id VARCHAR(36) NOT NULL,
    expires_at BIGINT NOT NULL
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_auth_sessions_refresh ON auth_sessions(refresh_digest)",
];

/// Schema for MySQL (no `CREATE INDEX IF NOT EXISTS`; indexes are inline).
pub const SCHEMA_MYSQL: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS kod_users (
    uid VARCHAR(36) PRIMARY KEY,
    user_id VARCHAR(64) NOT NULL,
    username VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL,
    phone VARCHAR(64),
    balance BIGINT NOT NULL,
    role VARCHAR(64) NOT NULL,
    created_at BIGINT NOT NULL,
    INDEX idx_kod_users_user_id (user_id)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS user_tokens (
    id VARCHAR(36) PRIMARY KEY,
    token VARCHAR(512) NOT NULL,
    uid VARCHAR(36) NOT NULL,
    expiry BIGINT NOT NULL,
    INDEX idx_user_tokens_uid (uid)
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS auth_identities (
    id VARCHAR(36) PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    password_hash VARCHAR(255) NOT NULL,
    created_at BIGINT NOT NULL
)
"#,
    r#"
CREATE TABLE IF NOT EXISTS auth_sessions (
    token_digest CHAR(64) PRIMARY KEY,
    refresh_digest CHAR(64) NOT NULL,
    identity_id VARCHAR(36) NOT NULL,
    expires_at BIGINT NOT NULL,
    INDEX idx_auth_sessions_refresh (refresh_digest)
)
"#,
];

// ============================================================================
// Profiles
// ============================================================================

pub const INSERT_PROFILE: &str = r#"
INSERT INTO kod_users (uid, user_id, username, email, phone, balance, role, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

/// Oldest profile wins when an identity somehow owns several.
pub const FIND_PROFILE_BY_IDENTITY: &str = r#"
SELECT uid, user_id, username, email, phone, balance, role
FROM kod_users
WHERE user_id = ?
ORDER BY created_at
LIMIT 1
"#;

// ============================================================================
// Access tokens
// ============================================================================

pub const INSERT_TOKEN: &str = r#"
INSERT INTO user_tokens (id, token, uid, expiry)
VALUES (?, ?, ?, ?)
"#;

pub const FIND_LIVE_TOKENS: &str = r#"
SELECT token, uid, expiry
FROM user_tokens
WHERE uid = ? AND expiry >= ?
LIMIT ?
"#;

pub const FIND_LIVE_TOKENS_EXACT: &str = r#"
SELECT token, uid, expiry
FROM user_tokens
WHERE uid = ? AND expiry >= ? AND token = ?
LIMIT ?
"#;

pub const LIST_TOKENS: &str = r#"
SELECT token, uid, expiry
FROM user_tokens
WHERE uid = ?
ORDER BY expiry DESC
"#;

pub const DELETE_TOKENS_FOR_OWNER: &str = "DELETE FROM user_tokens WHERE uid = ?";

pub const DELETE_TOKEN: &str = "DELETE FROM user_tokens WHERE token = ?";

pub const DELETE_EXPIRED_TOKENS: &str = "DELETE FROM user_tokens WHERE expiry < ?";

// ============================================================================
// Identities and sessions
// ============================================================================

pub const INSERT_IDENTITY: &str = r#"
INSERT INTO auth_identities (id, email, password_hash, created_at)
VALUES (?, ?, ?, ?)
"#;

pub const FIND_IDENTITY_BY_EMAIL: &str = r#"
SELECT id, email, password_hash
FROM auth_identities
WHERE email = ?
"#;

pub const DELETE_IDENTITY: &str = "DELETE FROM auth_identities WHERE id = ?";

pub const INSERT_SESSION: &str = r#"
INSERT INTO auth_sessions (token_digest, refresh_digest, identity_id, expires_at)
VALUES (?, ?, ?, ?)
"#;

pub const FIND_SESSION: &str = r#"
SELECT s.token_digest, s.identity_id, s.expires_at, i.email
FROM auth_sessions s
JOIN auth_identities i ON i.id = s.identity_id
WHERE s.token_digest = ?
"#;

pub const FIND_SESSION_BY_REFRESH: &str = r#"
SELECT s.token_digest, s.identity_id, s.expires_at, i.email
FROM auth_sessions s
JOIN auth_identities i ON i.id = s.identity_id
WHERE s.refresh_digest = ?
"#;

pub const DELETE_SESSION: &str = "DELETE FROM auth_sessions WHERE token_digest = ?";

pub const DELETE_SESSIONS_FOR_IDENTITY: &str = "DELETE FROM auth_sessions WHERE identity_id = ?";
