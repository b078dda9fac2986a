//! Configuration loading, CLI overrides and validation.
//!
//! A configuration file (JSON, YAML or TOML, chosen by extension) selects the
//! authentication provider and record store backends, the account policy
//! switches, where the client session is persisted and how logs are written.
//!
//! ```toml
//! [provider]
//! kind = "sql"
//!
//! [store]
//! kind = "sql"
//!
//! [database]
//! url = "sqlite:kodbank.db?mode=rwc"
//!
//! [account]
//! token_ttl_secs = 900
//! token_policy = "replace"
//! ```

mod cli;
mod defaults;
mod loader;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config};
pub use types::*;
pub use validate::validate_config;
