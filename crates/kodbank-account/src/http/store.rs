//! PostgREST record store.

use async_trait::async_trait;
use kodbank_core::defaults::{PROFILES_TABLE, TOKENS_TABLE};
use reqwest::{Method, RequestBuilder};
use tracing::debug;

use crate::error::AccountError;
use crate::model::{AccessTokenRecord, NewProfile, TokenQuery, UserProfile};
use crate::traits::RecordStore;

use super::api::HttpApi;
use super::wire::{ProfileInsert, ProfileRow, TokenRow, format_timestamp};

const TOKEN_COLUMNS: &str = "token,uid,expiry";

/// Record store backed by a hosted PostgREST API.
///
/// Requests carry the service-role key when one is configured, otherwise
/// the anon key; row-level security must then allow the calls.
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    api: HttpApi,
}

impl HttpRecordStore {
    /// Create a store over `api`.
    pub fn new(api: HttpApi) -> Self {
        Self { api }
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.api.privileged(method, &format!("/rest/v1/{table}"))
    }

    async fn fetch_tokens(
        &self,
        request: RequestBuilder,
    ) -> Result<Vec<AccessTokenRecord>, AccountError> {
        let rows: Vec<TokenRow> = self.api.send_json(request).await?;
        rows.into_iter().map(TokenRow::into_record).collect()
    }

    /// Delete matching token rows and count them from the representation.
    async fn delete_tokens(&self, filter: &[(&str, String)]) -> Result<u64, AccountError> {
        let request = self
            .table(Method::DELETE, TOKENS_TABLE)
            .query(filter)
            .query(&[("select", "token")])
            .header("Prefer", "return=representation");
        let removed: Vec<serde_json::Value> = self.api.send_json(request).await?;
        Ok(removed.len() as u64)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, AccountError> {
        let request = self
            .table(Method::POST, PROFILES_TABLE)
            .header("Prefer", "return=representation")
            .json(&ProfileInsert::from(profile));
        let rows: Vec<ProfileRow> = self.api.send_json(request).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AccountError::backend("profile insert returned no row"))?;
        debug!(uid = %row.uid, "profile row inserted");
        Ok(row.into())
    }

    async fn find_profile_by_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<UserProfile>, AccountError> {
        let request = self.table(Method::GET, PROFILES_TABLE).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{identity_id}")),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<ProfileRow> = self.api.send_json(request).await?;
        Ok(rows.into_iter().next().map(UserProfile::from))
    }

    async fn insert_token(&self, record: &AccessTokenRecord) -> Result<(), AccountError> {
        let request = self
            .table(Method::POST, TOKENS_TABLE)
            .header("Prefer", "return=minimal")
            .json(&TokenRow::from_record(record)?);
        self.api.send(request).await?;
        Ok(())
    }

    async fn find_tokens(
        &self,
        query: &TokenQuery,
    ) -> Result<Vec<AccessTokenRecord>, AccountError> {
        let params = token_query_params(query)?;
        self.fetch_tokens(self.table(Method::GET, TOKENS_TABLE).query(&params))
            .await
    }

    async fn list_tokens(&self, owner_id: &str) -> Result<Vec<AccessTokenRecord>, AccountError> {
        let request = self.table(Method::GET, TOKENS_TABLE).query(&[
            ("select", TOKEN_COLUMNS.to_string()),
            ("uid", format!("eq.{owner_id}")),
            ("order", "expiry.desc".to_string()),
        ]);
        self.fetch_tokens(request).await
    }

    async fn delete_tokens_for_owner(&self, owner_id: &str) -> Result<u64, AccountError> {
        self.delete_tokens(&[("uid", format!("eq.{owner_id}"))])
            .await
    }

    async fn delete_token(&self, token: &str) -> Result<u64, AccountError> {
        self.delete_tokens(&[("token", format!("eq.{token}"))]).await
    }

    async fn delete_expired_tokens(&self, now: i64) -> Result<u64, AccountError> {
        self.delete_tokens(&[("expiry", format!("lt.{}", format_timestamp(now)?))])
            .await
    }
}

/// PostgREST filters for a [`TokenQuery`].
fn token_query_params(query: &TokenQuery) -> Result<Vec<(&'static str, String)>, AccountError> {
    let mut params = vec![
        ("select", TOKEN_COLUMNS.to_string()),
        ("uid", format!("eq.{}", query.owner_id)),
        ("expiry", format!("gte.{}", format_timestamp(query.not_expired_at)?)),
        ("limit", query.limit.to_string()),
    ];
    if let Some(ref token) = query.token {
        params.push(("token", format!("eq.{token}")));
    }
    Ok(params)
}
