//! SQL database backends.
//!
//! This module provides a [`RecordStore`](crate::RecordStore) and a
//! self-hosted [`AuthProvider`](crate::AuthProvider) over SQL databases
//! (PostgreSQL, MySQL, SQLite) through the SQLx library.
//!
//! # Features
//!
//! Enable one or more database features in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! kodbank-account = { version = "0.1", features = ["sql-postgres"] }
//! # or
//! kodbank-account = { version = "0.1", features = ["sql-mysql"] }
//! # or
//! kodbank-account = { version = "0.1", features = ["sql-sqlite"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kodbank_account::sql::{SqlConfig, SqlDatabase};
//!
//! let db = SqlDatabase::connect(
//!     SqlConfig::new("sqlite:kodbank.db?mode=rwc").max_connections(4)
//! ).await?;
//! db.init_schema().await?;
//!
//! let provider = db.auth_provider();
//! let store = db.record_store();
//! ```
//!
//! # Database Schema
//!
//! [`SqlDatabase::init_schema`] creates the following tables (PostgreSQL
//! shown; MySQL and SQLite variants differ only in column types):
//!
//! ```sql
//! CREATE TABLE kod_users (
//!     uid VARCHAR(36) PRIMARY KEY,
//!     user_id VARCHAR(64) NOT NULL,     -- provider identity id
//!     username VARCHAR(255) NOT NULL,
//!     email VARCHAR(255) NOT NULL,
//!     phone VARCHAR(64),
//!     balance BIGINT NOT NULL,          -- minor units
//!     role VARCHAR(64) NOT NULL,
//!     created_at BIGINT NOT NULL
//! );
//!
//! CREATE TABLE user_tokens (
//!     id VARCHAR(36) PRIMARY KEY,
//!     token TEXT NOT NULL,
//!     uid VARCHAR(36) NOT NULL,         -- kod_users.uid
//!     expiry BIGINT NOT NULL            -- Unix seconds
//! );
//!
//! CREATE TABLE auth_identities (
//!     id VARCHAR(36) PRIMARY KEY,
//!     email VARCHAR(255) NOT NULL UNIQUE,
//!     password_hash TEXT NOT NULL,      -- argon2 PHC string
//!     created_at BIGINT NOT NULL
//! );
//!
//! CREATE TABLE auth_sessions (
//!     token_digest CHAR(64) PRIMARY KEY,   -- SHA-256 hex of the access token
//!     refresh_digest CHAR(64) NOT NULL,
//!     identity_id VARCHAR(36) NOT NULL,
//!     expires_at BIGINT NOT NULL
//! );
//! ```

mod backend;
mod config;
mod provider;
mod queries;
mod store;


pub use backend::{DatabaseType, SqlDatabase};
pub use config::SqlConfig;
pub use provider::SqlAuthProvider;
pub use store::SqlRecordStore;
