//! SQL connection pool and schema management.

use std::borrow::Cow;

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tracing::{debug, info};

use crate::error::AccountError;

use super::config::SqlConfig;
use super::provider::SqlAuthProvider;
use super::queries;
use super::store::SqlRecordStore;

/// Database type enum for dialect selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// PostgreSQL database.
    PostgreSQL,
    /// MySQL/MariaDB database.
    MySQL,
    /// SQLite database.
    SQLite,
}

impl DatabaseType {
    /// Detect database type from URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }
}

/// A pooled SQL database shared by [`SqlRecordStore`] and [`SqlAuthProvider`].
///
/// Cloning is cheap; clones share the pool.
#[derive(Clone)]
pub struct SqlDatabase {
    pool: AnyPool,
    db_type: DatabaseType,
}

impl SqlDatabase {
    /// Connect to the database.
    pub async fn connect(config: SqlConfig) -> Result<Self, AccountError> {
        // Install database drivers for the "any" pool
        sqlx::any::install_default_drivers();

        let db_type = DatabaseType::from_url(&config.database_url)
            .ok_or_else(|| AccountError::backend("unsupported database URL scheme"))?;

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.idle_timeout)
            .connect(&config.database_url)
            .await?;

        debug!(?db_type, max_connections = config.max_connections, "database pool ready");
        Ok(Self { pool, db_type })
    }

    /// Create the tables and indexes if they do not exist.
    pub async fn init_schema(&self) -> Result<(), AccountError> {
        let statements = match self.db_type {
            DatabaseType::MySQL => queries::SCHEMA_MYSQL,
            DatabaseType::PostgreSQL | DatabaseType::SQLite => queries::SCHEMA,
        };
        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!(db_type = ?self.db_type, "schema initialized");
        Ok(())
    }

    /// A record store over this database.
    pub fn record_store(&self) -> SqlRecordStore {
        SqlRecordStore::new(self.clone())
    }

    /// A self-hosted provider over this database.
    pub fn auth_provider(&self) -> SqlAuthProvider {
        SqlAuthProvider::new(self.clone())
    }

    /// Get the connection pool (for advanced usage).
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get database type.
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Adapt a `?`-placeholder statement to this database's dialect.
    pub(crate) fn sql<'a>(&self, statement: &'a str) -> Cow<'a, str> {
        match self.db_type {
            DatabaseType::PostgreSQL => Cow::Owned(numbered_placeholders(statement)),
            DatabaseType::MySQL | DatabaseType::SQLite => Cow::Borrowed(statement),
        }
    }
}

/// Rewrite `?` placeholders as `$1, $2, ...`.
///
/// Statements in this crate never contain `?` inside string literals.
pub(crate) fn numbered_placeholders(statement: &str) -> String {
    let mut out = String::with_capacity(statement.len() + 8);
    let mut n = 0;
    for c in statement.chars() {
        if c == '?' {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether `err` is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// Debug implementation (don't leak the connection URL)
impl std::fmt::Debug for SqlDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlDatabase")
            .field("db_type", &self.db_type)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}
