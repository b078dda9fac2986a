//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Account Defaults
// ============================================================================

/// Balance credited to a freshly registered profile, in minor currency units.
pub const DEFAULT_STARTING_BALANCE: i64 = 100_000;
/// Role assigned to a freshly registered profile.
pub const DEFAULT_ROLE: &str = "Customer";
/// Minimum password length accepted by the built-in providers (in characters).
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// Session Defaults
// ============================================================================

/// Lifetime of a provider session in seconds (matches GoTrue's default).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
/// Upper bound accepted for session and access token lifetimes (one year).
pub const MAX_TTL_SECS: u64 = 365 * 24 * 3600;
/// Default location of the persisted client session.
pub const DEFAULT_SESSION_PATH: &str = ".kodbank/session.json";
/// Length of generated access and refresh tokens, in random bytes.
pub const TOKEN_BYTES: usize = 32;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Profile table name.
pub const PROFILES_TABLE: &str = "kod_users";
/// Access token table name.
pub const TOKENS_TABLE: &str = "user_tokens";
/// Default maximum connections in the SQL pool.
pub const DEFAULT_SQL_MAX_CONNECTIONS: u32 = 5;
/// Default SQL connect timeout in seconds.
pub const DEFAULT_SQL_CONNECT_TIMEOUT_SECS: u64 = 30;
/// Default HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// Logging Defaults
// ============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Default log format.
pub const DEFAULT_LOG_FORMAT: &str = "pretty";
/// Default log output.
pub const DEFAULT_LOG_OUTPUT: &str = "stderr";
