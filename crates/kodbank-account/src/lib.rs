//! Account registration, login token issuance and balance verification.
//!
//! An [`AccountService`] drives four flows over two collaborators: an
//! [`AuthProvider`] that owns credentials and primary sessions, and a
//! [`RecordStore`] that owns user profiles and a secondary table of access
//! tokens. A balance is only revealed while the caller holds a provider
//! session *and* an unexpired access token row exists for their profile.
//!
//! # Example
//!
//! ```
//! use kodbank_account::{
//!     AccountService, Credentials, MemoryAuthProvider, MemoryRecordStore, Registration,
//!     ServiceConfig, SessionContext,
//! };
//!
//! # async fn example() -> Result<(), kodbank_account::AccountError> {
//! let service = AccountService::new(
//!     MemoryAuthProvider::new(),
//!     MemoryRecordStore::new(),
//!     ServiceConfig::default(),
//! );
//! let mut ctx = SessionContext::new();
//!
//! service
//!     .register(&mut ctx, &Registration::new("john", "john@example.com", "secret1"))
//!     .await?;
//! service
//!     .login(&mut ctx, &Credentials::new("john@example.com", "secret1"))
//!     .await?;
//!
//! let balance = service.check_balance(&mut ctx).await?;
//! println!("{}: {}", balance.username, balance.balance);
//!
//! service.logout(&mut ctx).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Backends
//!
//! - [`memory`]: in-process fakes, used by tests and `kodbank demo`
//! - `sql` (feature `sql-*`): PostgreSQL, MySQL or SQLite through sqlx
//! - `http` (feature `http`): a hosted GoTrue / PostgREST project

mod config;
mod error;
mod hash;
mod model;
mod service;
mod session;
mod traits;

pub mod memory;

#[cfg(feature = "sql")]
pub mod sql;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::ServiceConfig;
pub use error::AccountError;
pub use hash::{generate_token, hash_password, token_digest, verify_password};
pub use memory::{MemoryAuthProvider, MemoryRecordStore};
pub use model::{
    AccessTokenRecord, Balance, Credentials, Identity, LoginOutcome, NewProfile,
    ProviderSession, Registration, Role, SignUp, TokenQuery, UserProfile,
};
pub use service::AccountService;
pub use session::SessionContext;
pub use traits::{AuthProvider, RecordStore};

pub use kodbank_config::TokenPolicy;
pub use kodbank_core::{Clock, ManualClock, SystemClock};

#[cfg(feature = "cli")]
pub use cli::{AccountArgs, AccountCommands};
