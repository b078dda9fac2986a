//! In-memory record store.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::AccountError;
use crate::model::{AccessTokenRecord, NewProfile, TokenQuery, UserProfile};
use crate::traits::RecordStore;

/// Record store keeping profile and token rows in vectors.
///
/// Rows keep insertion order; like the hosted table, nothing is unique.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    profiles: RwLock<Vec<UserProfile>>,
    tokens: RwLock<Vec<AccessTokenRecord>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of profile rows.
    pub fn profile_count(&self) -> usize {
        self.profiles.read().len()
    }

    /// Number of token rows, live or expired.
    pub fn token_count(&self) -> usize {
        self.tokens.read().len()
    }

    /// Copy of every token row in insertion order.
    pub fn tokens(&self) -> Vec<AccessTokenRecord> {
        self.tokens.read().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, AccountError> {
        let profile = profile.clone().into_profile(uuid::Uuid::new_v4().to_string());
        self.profiles.write().push(profile.clone());
        Ok(profile)
    }

    async fn find_profile_by_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<UserProfile>, AccountError> {
        Ok(self
            .profiles
            .read()
            .iter()
            .find(|p| p.user_id == identity_id)
            .cloned())
    }

    async fn insert_token(&self, record: &AccessTokenRecord) -> Result<(), AccountError> {
        self.tokens.write().push(record.clone());
        Ok(())
    }

    async fn find_tokens(
        &self,
        query: &TokenQuery,
    ) -> Result<Vec<AccessTokenRecord>, AccountError> {
        Ok(self
            .tokens
            .read()
            .iter()
            .filter(|t| query.matches(t))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn list_tokens(&self, owner_id: &str) -> Result<Vec<AccessTokenRecord>, AccountError> {
        let mut tokens: Vec<_> = self
            .tokens
            .read()
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.expiry.cmp(&a.expiry));
        Ok(tokens)
    }

    async fn delete_tokens_for_owner(&self, owner_id: &str) -> Result<u64, AccountError> {
        Ok(remove_where(&self.tokens, |t| t.owner_id == owner_id))
    }

    async fn delete_token(&self, token: &str) -> Result<u64, AccountError> {
        Ok(remove_where(&self.tokens, |t| t.token == token))
    }

    async fn delete_expired_tokens(&self, now: i64) -> Result<u64, AccountError> {
        Ok(remove_where(&self.tokens, |t| t.expiry < now))
    }
}

fn remove_where(
    tokens: &RwLock<Vec<AccessTokenRecord>>,
    pred: impl Fn(&AccessTokenRecord) -> bool,
) -> u64 {
    let mut tokens = tokens.write();
    let before = tokens.len();
    tokens.retain(|t| !pred(t));
    (before - tokens.len()) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    fn new_profile(user_id: &str) -> NewProfile {
        NewProfile {
            user_id: user_id.into(),
            username: "bob".into(),
            email: "bob@example.com".into(),
            phone: None,
            balance: 100_000,
            role: Role::Customer,
        }
    }

    fn token(value: &str, owner: &str, expiry: i64) -> AccessTokenRecord {
        AccessTokenRecord {
            token: value.into(),
            owner_id: owner.into(),
            expiry,
        }
    }

    #[tokio::test]
    async fn test_profile_insert_and_lookup() {
        let store = MemoryRecordStore::new();
        let profile = store.insert_profile(&new_profile("id-1")).await.unwrap();
        assert_eq!(profile.uid.len(), 36);

        let found = store.find_profile_by_identity("id-1").await.unwrap();
        assert_eq!(found, Some(profile));
        assert!(store.find_profile_by_identity("id-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_filters_and_limit() {
        let store = MemoryRecordStore::new();
        store.insert_token(&token("a", "u1", 100)).await.unwrap();
        store.insert_token(&token("b", "u1", 200)).await.unwrap();
        store.insert_token(&token("c", "u2", 300)).await.unwrap();

        let live = store
            .find_tokens(&TokenQuery::live("u1", 150).limit(10))
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].token, "b");

        let limited = store.find_tokens(&TokenQuery::live("u1", 0)).await.unwrap();
        assert_eq!(limited.len(), 1);

        let listed = store.list_tokens("u1").await.unwrap();
        assert_eq!(
            listed.iter().map(|t| t.token.as_str()).collect::<Vec<_>>(),
            ["b", "a"]
        );
    }

    #[tokio::test]
    async fn test_deletes() {
        let store = MemoryRecordStore::new();
        store.insert_token(&token("a", "u1", 100)).await.unwrap();
        store.insert_token(&token("a", "u1", 200)).await.unwrap();
        store.insert_token(&token("b", "u1", 300)).await.unwrap();
        store.insert_token(&token("c", "u2", 50)).await.unwrap();

        assert_eq!(store.delete_expired_tokens(100).await.unwrap(), 1);
        assert_eq!(store.delete_token("a").await.unwrap(), 2);
        assert_eq!(store.delete_tokens_for_owner("u1").await.unwrap(), 1);
        assert_eq!(store.token_count(), 0);
    }
}
