//! Account service configuration.

use std::time::Duration;

use kodbank_config::{AccountConfig, TokenPolicy};
use kodbank_core::defaults::{DEFAULT_ROLE, DEFAULT_STARTING_BALANCE};

use crate::model::Role;

/// Policy consumed by [`AccountService`](crate::AccountService).
///
/// The default reproduces the historical flow exactly: tokens follow the
/// provider session's expiry, accumulate per login, survive logout and any
/// live token of the profile satisfies a balance check.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Balance of a new profile, in minor units.
    pub starting_balance: i64,
    /// Role of a new profile.
    pub default_role: Role,
    /// Cap on access token lifetime. `None` = token expires with the session.
    pub token_ttl: Option<Duration>,
    /// What happens to earlier token rows on login.
    pub token_policy: TokenPolicy,
    /// Delete the ended session's token rows on logout.
    pub revoke_on_logout: bool,
    /// Balance check requires the row of the current session's token.
    pub bind_token_to_session: bool,
    /// Login fails with `ProfileNotFound` when the identity has no profile.
    pub require_profile_on_login: bool,
    /// Delete the provider identity when the profile insert fails.
    pub compensate_failed_registration: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            default_role: Role::from(DEFAULT_ROLE),
            token_ttl: None,
            token_policy: TokenPolicy::Append,
            revoke_on_logout: false,
            bind_token_to_session: false,
            require_profile_on_login: false,
            compensate_failed_registration: false,
        }
    }
}

impl ServiceConfig {
    /// Create a config with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[account]` section of a config file.
    pub fn from_account_config(config: &AccountConfig) -> Self {
        Self {
            starting_balance: config.starting_balance,
            default_role: Role::from(config.default_role.as_str()),
            token_ttl: config.token_ttl_secs.map(Duration::from_secs),
            token_policy: config.token_policy,
            revoke_on_logout: config.revoke_on_logout,
            bind_token_to_session: config.bind_token_to_session,
            require_profile_on_login: config.require_profile_on_login,
            compensate_failed_registration: config.compensate_failed_registration,
        }
    }

    /// Builder: set starting balance.
    pub fn starting_balance(mut self, balance: i64) -> Self {
        self.starting_balance = balance;
        self
    }

    /// Builder: cap access token lifetime.
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    /// Builder: set token policy.
    pub fn token_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    /// Builder: revoke token rows on logout.
    pub fn revoke_on_logout(mut self, enabled: bool) -> Self {
        self.revoke_on_logout = enabled;
        self
    }

    /// Builder: bind the balance check to the current session's token.
    pub fn bind_token_to_session(mut self, enabled: bool) -> Self {
        self.bind_token_to_session = enabled;
        self
    }

    /// Builder: require a profile at login.
    pub fn require_profile_on_login(mut self, enabled: bool) -> Self {
        self.require_profile_on_login = enabled;
        self
    }

    /// Builder: compensate a failed profile insert.
    pub fn compensate_failed_registration(mut self, enabled: bool) -> Self {
        self.compensate_failed_registration = enabled;
        self
    }
}
