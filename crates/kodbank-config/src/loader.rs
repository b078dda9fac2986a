//! Configuration file loading and error types.

use std::{fs, path::Path};

use crate::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format")]
    UnsupportedFormat,
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
        "json" => Ok(serde_json::from_str(&data)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&data)?),
        "toml" => Ok(toml::from_str(&data)?),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{BackendKind, TokenPolicy};

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "kodbank.toml",
            r#"
[provider]
kind = "sql"

[store]
kind = "sql"

[database]
url = "sqlite::memory:"
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.provider.kind, BackendKind::Sql);
        assert_eq!(config.provider.min_password_len, 6);
        assert_eq!(config.provider.session_ttl_secs, 3600);
        assert_eq!(config.account.starting_balance, 100_000);
        assert_eq!(config.account.default_role, "Customer");
        assert_eq!(config.account.token_policy, TokenPolicy::Append);
        assert!(!config.account.revoke_on_logout);
        assert_eq!(config.database.unwrap().max_connections, 5);
        assert_eq!(config.session.path, ".kodbank/session.json");
    }

    #[test]
    fn test_load_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let json = write_file(
            &dir,
            "kodbank.json",
            r#"{
  "provider": { "kind": "http" },
  "store": { "kind": "http" },
  "http": { "url": "https://example.supabase.co", "api_key": "anon" },
  "account": { "token_ttl_secs": 60, "token_policy": "replace" }
}"#,
        );
        let config = load_config(&json).unwrap();
        assert_eq!(config.store.kind, BackendKind::Http);
        assert_eq!(config.account.token_ttl_secs, Some(60));
        assert_eq!(config.account.token_policy, TokenPolicy::Replace);
        assert_eq!(config.http.unwrap().timeout_secs, 15);

        let yaml = write_file(
            &dir,
            "kodbank.yaml",
            "provider:\n  kind: memory\nstore:\n  kind: memory\naccount:\n  revoke_on_logout: true\n",
        );
        let config = load_config(&yaml).unwrap();
        assert_eq!(config.provider.kind, BackendKind::Memory);
        assert!(config.account.revoke_on_logout);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "kodbank.ini", "kind=sql");
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::UnsupportedFormat)
        ));
    }

    #[test]
    fn test_unknown_backend_kind_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "kodbank.toml",
            "[provider]\nkind = \"ldap\"\n[store]\nkind = \"sql\"\n",
        );
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }
}
