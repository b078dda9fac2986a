//! SQL record store.

use std::sync::Arc;

use async_trait::async_trait;
use kodbank_core::{Clock, SystemClock};
use sqlx::Row;
use sqlx::any::AnyRow;
use tracing::debug;

use crate::error::AccountError;
use crate::model::{AccessTokenRecord, NewProfile, TokenQuery, UserProfile};
use crate::traits::RecordStore;

use super::backend::SqlDatabase;
use super::queries;

/// Record store over the `kod_users` and `user_tokens` tables.
///
/// Profiles are stamped with `created_at` from the store's clock; the oldest
/// profile of an identity wins a lookup.
#[derive(Clone)]
pub struct SqlRecordStore {
    db: SqlDatabase,
    clock: Arc<dyn Clock>,
}

impl SqlRecordStore {
    /// Create a store over `db` on the system clock.
    pub fn new(db: SqlDatabase) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
        }
    }

    /// Builder: read time from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The underlying database.
    pub fn database(&self) -> &SqlDatabase {
        &self.db
    }

    fn parse_profile_row(row: &AnyRow) -> Result<UserProfile, AccountError> {
        let role: String = row.try_get("role")?;
        Ok(UserProfile {
            uid: row.try_get("uid")?,
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            balance: row.try_get("balance")?,
            role: role.into(),
        })
    }

    fn parse_token_row(row: &AnyRow) -> Result<AccessTokenRecord, AccountError> {
        Ok(AccessTokenRecord {
            token: row.try_get("token")?,
            owner_id: row.try_get("uid")?,
            expiry: row.try_get("expiry")?,
        })
    }

    async fn execute_one(&self, statement: &str, value: &str) -> Result<u64, AccountError> {
        let result = sqlx::query(&self.db.sql(statement))
            .bind(value)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, AccountError> {
        let profile = profile.clone().into_profile(uuid::Uuid::new_v4().to_string());
        sqlx::query(&self.db.sql(queries::INSERT_PROFILE))
            .bind(&profile.uid)
            .bind(&profile.user_id)
            .bind(&profile.username)
            .bind(&profile.email)
            .bind(profile.phone.as_deref())
            .bind(profile.balance)
            .bind(profile.role.as_str())
            .bind(self.clock.now_unix())
            .execute(self.db.pool())
            .await?;
        debug!(uid = %profile.uid, "profile row inserted");
        Ok(profile)
    }

    async fn find_profile_by_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<UserProfile>, AccountError> {
        sqlx::query(&self.db.sql(queries::FIND_PROFILE_BY_IDENTITY))
            .bind(identity_id)
            .fetch_optional(self.db.pool())
            .await?
            .as_ref()
            .map(Self::parse_profile_row)
            .transpose()
    }

    async fn insert_token(&self, record: &AccessTokenRecord) -> Result<(), AccountError> {
        sqlx::query(&self.db.sql(queries::INSERT_TOKEN))
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&record.token)
            .bind(&record.owner_id)
            .bind(record.expiry)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn find_tokens(
        &self,
        query: &TokenQuery,
    ) -> Result<Vec<AccessTokenRecord>, AccountError> {
        let limit = query.limit.min(i64::MAX as usize) as i64;
        let rows = match query.token {
            Some(ref token) => {
                sqlx::query(&self.db.sql(queries::FIND_LIVE_TOKENS_EXACT))
                    .bind(&query.owner_id)
                    .bind(query.not_expired_at)
                    .bind(token)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                sqlx::query(&self.db.sql(queries::FIND_LIVE_TOKENS))
                    .bind(&query.owner_id)
                    .bind(query.not_expired_at)
                    .bind(limit)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };
        rows.iter().map(Self::parse_token_row).collect()
    }

    async fn list_tokens(&self, owner_id: &str) -> Result<Vec<AccessTokenRecord>, AccountError> {
        let rows = sqlx::query(&self.db.sql(queries::LIST_TOKENS))
            .bind(owner_id)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(Self::parse_token_row).collect()
    }

    async fn delete_tokens_for_owner(&self, owner_id: &str) -> Result<u64, AccountError> {
        self.execute_one(queries::DELETE_TOKENS_FOR_OWNER, owner_id)
            .await
    }

    async fn delete_token(&self, token: &str) -> Result<u64, AccountError> {
        self.execute_one(queries::DELETE_TOKEN, token).await
    }

    async fn delete_expired_tokens(&self, now: i64) -> Result<u64, AccountError> {
        let result = sqlx::query(&self.db.sql(queries::DELETE_EXPIRED_TOKENS))
            .bind(now)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

impl std::fmt::Debug for SqlRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlRecordStore")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}
