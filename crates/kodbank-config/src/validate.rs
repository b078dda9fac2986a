//! Configuration validation logic.

use kodbank_core::defaults::MAX_TTL_SECS;

use crate::Config;
use crate::loader::ConfigError;

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.uses_sql() {
        match &config.database {
            None => {
                return Err(ConfigError::Validation(
                    "database section is required when a backend is 'sql'".into(),
                ));
            }
            Some(db) => {
                if db.url.trim().is_empty() {
                    return Err(ConfigError::Validation("database.url is empty".into()));
                }
                if db.max_connections == 0 {
                    return Err(ConfigError::Validation(
                        "database.max_connections must be > 0".into(),
                    ));
                }
            }
        }
    }
    if config.uses_http() {
        match &config.http {
            None => {
                return Err(ConfigError::Validation(
                    "http section is required when a backend is 'http'".into(),
                ));
            }
            Some(http) => {
                if !(http.url.starts_with("http://") || http.url.starts_with("https://")) {
                    return Err(ConfigError::Validation(
                        "http.url must start with http:// or https://".into(),
                    ));
                }
                if http.api_key.trim().is_empty() {
                    return Err(ConfigError::Validation("http.api_key is empty".into()));
                }
                if http.timeout_secs == 0 {
                    return Err(ConfigError::Validation(
                        "http.timeout_secs must be > 0".into(),
                    ));
                }
            }
        }
    }
    if config.provider.min_password_len == 0 {
        return Err(ConfigError::Validation(
            "provider.min_password_len must be > 0".into(),
        ));
    }
    if config.provider.session_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "provider.session_ttl_secs must be > 0".into(),
        ));
    }
    if config.provider.session_ttl_secs > MAX_TTL_SECS {
        return Err(ConfigError::Validation(format!(
            "provider.session_ttl_secs must be <= {MAX_TTL_SECS}"
        )));
    }
    if config.account.starting_balance < 0 {
        return Err(ConfigError::Validation(
            "account.starting_balance must be >= 0".into(),
        ));
    }
    if config.account.default_role.trim().is_empty() {
        return Err(ConfigError::Validation("account.default_role is empty".into()));
    }
    if config.account.token_ttl_secs == Some(0) {
        return Err(ConfigError::Validation(
            "account.token_ttl_secs must be > 0 (omit it to follow the session)".into(),
        ));
    }
    if config.account.token_ttl_secs.is_some_and(|ttl| ttl > MAX_TTL_SECS) {
        return Err(ConfigError::Validation(format!(
            "account.token_ttl_secs must be <= {MAX_TTL_SECS}"
        )));
    }
    if config.session.path.trim().is_empty() {
        return Err(ConfigError::Validation("session.path is empty".into()));
    }
    if let Some(format) = config.logging.format.as_deref()
        && !matches!(format, "pretty" | "compact" | "json")
    {
        return Err(ConfigError::Validation(
            "logging.format must be one of: pretty, compact, json".into(),
        ));
    }
    if let Some(output) = config.logging.output.as_deref()
        && !matches!(output, "stderr" | "stdout")
    {
        return Err(ConfigError::Validation(
            "logging.output must be 'stderr' or 'stdout'".into(),
        ));
    }
    Ok(())
}
