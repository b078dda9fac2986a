//! # kodbank
//!
//! Account registration, login token issuance and balance verification.
//!
//! ## Crates
//!
//! - [`kodbank_core`] - Default values and the clock abstraction
//! - [`kodbank_config`] - Configuration loading and validation
//! - [`kodbank_account`] - Account flows, collaborator traits and backends

pub use kodbank_account as account;
pub use kodbank_config as config;
pub use kodbank_core as core;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use kodbank_account::{
        AccountError, AccountService, AuthProvider, Credentials, MemoryAuthProvider,
        MemoryRecordStore, RecordStore, Registration, ServiceConfig, SessionContext,
    };
    pub use kodbank_config::{Config, load_config, validate_config};
}
