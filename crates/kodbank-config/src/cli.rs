//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;
use crate::defaults::*;
use crate::types::*;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override database URL (creates the [database] section if missing)
    #[arg(long, env = "KODBANK_DATABASE_URL")]
    pub database_url: Option<String>,
    /// Override hosted API base URL
    #[arg(long, env = "KODBANK_API_URL")]
    pub api_url: Option<String>,
    /// Override hosted API (anon) key
    #[arg(long, env = "KODBANK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Override session file path
    #[arg(long)]
    pub session_path: Option<String>,
    /// Override access token lifetime cap in seconds (0 = follow the session)
    #[arg(long)]
    pub token_ttl_secs: Option<u64>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(url) = &overrides.database_url {
        match config.database.as_mut() {
            Some(db) => db.url = url.clone(),
            None => {
                config.database = Some(DatabaseConfig {
                    url: url.clone(),
                    max_connections: default_sql_max_connections(),
                    connect_timeout_secs: default_sql_connect_timeout_secs(),
                });
            }
        }
    }
    if let Some(url) = &overrides.api_url {
        match config.http.as_mut() {
            Some(http) => http.url = url.clone(),
            None => {
                config.http = Some(HttpConfig {
                    url: url.clone(),
                    api_key: overrides.api_key.clone().unwrap_or_default(),
                    service_role_key: None,
                    timeout_secs: default_http_timeout_secs(),
                });
            }
        }
    }
    if let Some(key) = &overrides.api_key
        && let Some(http) = config.http.as_mut()
    {
        http.api_key = key.clone();
    }
    if let Some(path) = &overrides.session_path {
        config.session.path = path.clone();
    }
    // 0 removes the cap
    if let Some(ttl) = overrides.token_ttl_secs {
        config.account.token_ttl_secs = if ttl == 0 { None } else { Some(ttl) };
    }
    if let Some(level) = &overrides.log_level {
        config.logging.level = Some(level.clone());
    }
}
