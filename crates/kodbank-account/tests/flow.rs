//! End-to-end account flows on the in-memory backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kodbank_account::{
    AccessTokenRecord, AccountError, AccountService, AuthProvider, Credentials,
    MemoryAuthProvider, MemoryRecordStore, NewProfile, RecordStore, Registration,
    ServiceConfig, SessionContext, TokenPolicy, TokenQuery, UserProfile,
};
use kodbank_core::{Clock, ManualClock};

const EMAIL: &str = "john@example.com";
const PASSWORD: &str = "secret1";

/// Record store that can be told to reject profile inserts.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryRecordStore,
    fail_profile_insert: AtomicBool,
}

impl FlakyStore {
    fn failing() -> Self {
        let store = Self::default();
        store.fail_profile_insert.store(true, Ordering::SeqCst);
        store
    }

    fn heal(&self) {
        self.fail_profile_insert.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn insert_profile(&self, profile: &NewProfile) -> Result<UserProfile, AccountError> {
        if self.fail_profile_insert.load(Ordering::SeqCst) {
            return Err(AccountError::backend("insert rejected"));
        }
        self.inner.insert_profile(profile).await
    }

    async fn find_profile_by_identity(
        &self,
        identity_id: &str,
    ) -> Result<Option<UserProfile>, AccountError> {
        self.inner.find_profile_by_identity(identity_id).await
    }

    async fn insert_token(&self, record: &AccessTokenRecord) -> Result<(), AccountError> {
        self.inner.insert_token(record).await
    }

    async fn find_tokens(
        &self,
        query: &TokenQuery,
    ) -> Result<Vec<AccessTokenRecord>, AccountError> {
        self.inner.find_tokens(query).await
    }

    async fn list_tokens(&self, owner_id: &str) -> Result<Vec<AccessTokenRecord>, AccountError> {
        self.inner.list_tokens(owner_id).await
    }

    async fn delete_tokens_for_owner(&self, owner_id: &str) -> Result<u64, AccountError> {
        self.inner.delete_tokens_for_owner(owner_id).await
    }

    async fn delete_token(&self, token: &str) -> Result<u64, AccountError> {
        self.inner.delete_token(token).await
    }

    async fn delete_expired_tokens(&self, now: i64) -> Result<u64, AccountError> {
        self.inner.delete_expired_tokens(now).await
    }
}

type Service = AccountService<MemoryAuthProvider, FlakyStore>;

fn service_with(config: ServiceConfig, store: FlakyStore) -> (Service, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let provider = MemoryAuthProvider::new().with_clock(clock.clone());
    let service = AccountService::new(provider, store, config).with_clock(clock.clone());
    (service, clock)
}

fn service(config: ServiceConfig) -> (Service, Arc<ManualClock>) {
    service_with(config, FlakyStore::default())
}

async fn register(service: &Service) -> UserProfile {
    let mut ctx = SessionContext::new();
    service
        .register(&mut ctx, &Registration::new("john", EMAIL, PASSWORD))
        .await
        .unwrap()
}

async fn login(service: &Service) -> SessionContext {
    let mut ctx = SessionContext::new();
    service
        .login(&mut ctx, &Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();
    ctx
}

// ── Registration ──────────────────────────────────────────────────

#[tokio::test]
async fn test_register_creates_profile_and_signs_out() {
    let (service, _) = service(ServiceConfig::default());
    let mut ctx = SessionContext::new();

    let profile = service
        .register(
            &mut ctx,
            &Registration::new(" john ", EMAIL, PASSWORD).phone("555-0100"),
        )
        .await
        .unwrap();

    assert_eq!(profile.username, "john");
    assert_eq!(profile.email, EMAIL);
    assert_eq!(profile.phone.as_deref(), Some("555-0100"));
    assert_eq!(profile.balance, 100_000);
    assert_eq!(profile.role.as_str(), "Customer");

    assert!(!ctx.is_signed_in());
    assert_eq!(service.provider().active_sessions(), 0);
    assert_eq!(service.store().inner.profile_count(), 1);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let (service, _) = service(ServiceConfig::default());
    register(&service).await;

    let mut ctx = SessionContext::new();
    let err = service
        .register(
            &mut ctx,
            &Registration::new("johnny", "JOHN@example.com", "another1"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AccountError::CredentialConflict));
    assert_eq!(service.store().inner.profile_count(), 1);
}

#[tokio::test]
async fn test_register_short_password_is_weak() {
    let (service, _) = service(ServiceConfig::default());
    let mut ctx = SessionContext::new();

    let err = service
        .register(&mut ctx, &Registration::new("john", EMAIL, "12345"))
        .await
        .unwrap_err();

    assert!(matches!(err, AccountError::WeakCredential(_)));
    assert_eq!(service.provider().identity_count(), 0);
    assert_eq!(service.store().inner.profile_count(), 0);
}

#[tokio::test]
async fn test_failed_profile_insert_leaves_orphan_identity() {
    let (service, _) = service_with(ServiceConfig::default(), FlakyStore::failing());
    let mut ctx = SessionContext::new();

    let err = service
        .register(&mut ctx, &Registration::new("john", EMAIL, PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::Backend(_)));
    assert!(!ctx.is_signed_in());
    assert_eq!(service.provider().identity_count(), 1);

    // The orphan can log in but has no balance
    let outcome = service
        .login(&mut ctx, &Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();
    assert!(outcome.profile.is_none());
    assert!(outcome.token.is_none());
    assert_eq!(service.store().inner.token_count(), 0);

    let err = service.check_balance(&mut ctx).await.unwrap_err();
    assert!(matches!(err, AccountError::ProfileNotFound));
}

#[tokio::test]
async fn test_compensation_deletes_orphan_identity() {
    let (service, _) = service_with(
        ServiceConfig::default().compensate_failed_registration(true),
        FlakyStore::failing(),
    );
    let mut ctx = SessionContext::new();

    service
        .register(&mut ctx, &Registration::new("john", EMAIL, PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(service.provider().identity_count(), 0);
    assert!(!ctx.is_signed_in());

    // The email can be registered again
    service.store().heal();
    let profile = register(&service).await;
    assert_eq!(profile.balance, 100_000);
}

// ── Login and balance ─────────────────────────────────────────────

#[tokio::test]
async fn test_login_then_balance() {
    let (service, clock) = service(ServiceConfig::default());
    let profile = register(&service).await;

    let mut ctx = SessionContext::new();
    let outcome = service
        .login(&mut ctx, &Credentials::new("  John@Example.com ", PASSWORD))
        .await
        .unwrap();

    let token = outcome.token.unwrap();
    assert_eq!(token.owner_id, profile.uid);
    assert_eq!(token.token, ctx.session().unwrap().access_token);
    assert_eq!(token.expiry, outcome.session_expires_at);
    assert_eq!(outcome.session_expires_at, clock.now_unix() + 3600);

    let balance = service.check_balance(&mut ctx).await.unwrap();
    assert_eq!(balance.username, "john");
    assert_eq!(balance.balance, 100_000);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (service, _) = service(ServiceConfig::default());
    register(&service).await;
    let mut ctx = SessionContext::new();

    let err = service
        .login(&mut ctx, &Credentials::new(EMAIL, "wrong-password"))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::InvalidCredentials));
    assert!(!ctx.is_signed_in());
    assert_eq!(service.store().inner.token_count(), 0);
}

#[tokio::test]
async fn test_balance_requires_session() {
    let (service, _) = service(ServiceConfig::default());
    register(&service).await;

    let err = service
        .check_balance(&mut SessionContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::NotAuthenticated));
}

#[tokio::test]
async fn test_expired_token_forces_sign_out() {
    let (service, clock) = service(ServiceConfig::default().token_ttl(Duration::from_secs(60)));
    register(&service).await;
    let mut ctx = login(&service).await;

    clock.advance(Duration::from_secs(60));
    service.check_balance(&mut ctx).await.unwrap();

    clock.advance(Duration::from_secs(1));
    let err = service.check_balance(&mut ctx).await.unwrap_err();
    assert!(matches!(err, AccountError::TokenExpired));
    assert!(err.forces_logout());
    assert!(!ctx.is_signed_in());
    assert_eq!(service.provider().active_sessions(), 0);

    let err = service.check_balance(&mut ctx).await.unwrap_err();
    assert!(matches!(err, AccountError::NotAuthenticated));
}

#[tokio::test]
async fn test_oversized_token_ttl_follows_session() {
    for secs in [u64::MAX, i64::MAX as u64] {
        let (service, clock) =
            service(ServiceConfig::default().token_ttl(Duration::from_secs(secs)));
        register(&service).await;

        let mut ctx = SessionContext::new();
        let outcome = service
            .login(&mut ctx, &Credentials::new(EMAIL, PASSWORD))
            .await
            .unwrap();
        assert_eq!(outcome.token.unwrap().expiry, clock.now_unix() + 3600);

        let balance = service.check_balance(&mut ctx).await.unwrap();
        assert_eq!(balance.balance, 100_000);
    }
}

#[tokio::test]
async fn test_expired_session_is_not_authenticated() {
    let (service, clock) = service(ServiceConfig::default());
    register(&service).await;
    let mut ctx = login(&service).await;

    clock.advance(Duration::from_secs(3600));
    let err = service.check_balance(&mut ctx).await.unwrap_err();
    assert!(matches!(err, AccountError::NotAuthenticated));
    assert!(!ctx.is_signed_in());
}

#[tokio::test]
async fn test_two_logins_two_tokens() {
    let (service, clock) = service(ServiceConfig::default().token_ttl(Duration::from_secs(100)));
    register(&service).await;

    let _first = login(&service).await;
    clock.advance(Duration::from_secs(50));
    let mut second = login(&service).await;

    let tokens = service.store().inner.tokens();
    assert_eq!(tokens.len(), 2);
    assert_ne!(tokens[0].token, tokens[1].token);

    // First token expired, second still live
    clock.advance(Duration::from_secs(60));
    service.check_balance(&mut second).await.unwrap();

    let listed = service.tokens(&mut second).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].expiry > listed[1].expiry);
}

#[tokio::test]
async fn test_any_live_token_satisfies_balance_by_default() {
    let (service, clock) = service(ServiceConfig::default().token_ttl(Duration::from_secs(100)));
    register(&service).await;

    let mut first = login(&service).await;
    clock.advance(Duration::from_secs(50));
    let _second = login(&service).await;
    clock.advance(Duration::from_secs(60));

    // The first session's own row is expired; the second's is not
    service.check_balance(&mut first).await.unwrap();
}

#[tokio::test]
async fn test_bind_token_to_session() {
    let (service, clock) = service(
        ServiceConfig::default()
            .token_ttl(Duration::from_secs(100))
            .bind_token_to_session(true),
    );
    register(&service).await;

    let mut first = login(&service).await;
    clock.advance(Duration::from_secs(50));
    let mut second = login(&service).await;
    clock.advance(Duration::from_secs(60));

    let err = service.check_balance(&mut first).await.unwrap_err();
    assert!(matches!(err, AccountError::TokenExpired));
    assert!(!first.is_signed_in());

    service.check_balance(&mut second).await.unwrap();
}

#[tokio::test]
async fn test_require_profile_on_login() {
    let (service, _) = service(ServiceConfig::default().require_profile_on_login(true));
    service
        .provider()
        .create_identity(&Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap();

    let mut ctx = SessionContext::new();
    let err = service
        .login(&mut ctx, &Credentials::new(EMAIL, PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::ProfileNotFound));
    assert!(!ctx.is_signed_in());
}

#[tokio::test]
async fn test_replace_policy_keeps_one_token() {
    let (service, _) = service(ServiceConfig::default().token_policy(TokenPolicy::Replace));
    register(&service).await;

    login(&service).await;
    let ctx = login(&service).await;

    let tokens = service.store().inner.tokens();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token, ctx.session().unwrap().access_token);
}

// ── Logout and housekeeping ───────────────────────────────────────

#[tokio::test]
async fn test_logout_then_balance() {
    let (service, _) = service(ServiceConfig::default());
    register(&service).await;
    let mut ctx = login(&service).await;

    service.logout(&mut ctx).await.unwrap();
    assert!(!ctx.is_signed_in());
    // Rows are left to expire
    assert_eq!(service.store().inner.token_count(), 1);

    let err = service.check_balance(&mut ctx).await.unwrap_err();
    assert!(matches!(err, AccountError::NotAuthenticated));

    // Logging out twice is harmless
    service.logout(&mut ctx).await.unwrap();
}

#[tokio::test]
async fn test_revoke_on_logout() {
    let (service, _) = service(ServiceConfig::default().revoke_on_logout(true));
    register(&service).await;
    let _other = login(&service).await;
    let mut ctx = login(&service).await;
    let ended = ctx.session().unwrap().access_token.clone();

    service.logout(&mut ctx).await.unwrap();

    // Only the ended session's row is revoked
    let tokens = service.store().inner.tokens();
    assert_eq!(tokens.len(), 1);
    assert_ne!(tokens[0].token, ended);
}

#[tokio::test]
async fn test_prune_expired_tokens() {
    let (service, clock) = service(ServiceConfig::default().token_ttl(Duration::from_secs(30)));
    register(&service).await;

    login(&service).await;
    login(&service).await;
    clock.advance(Duration::from_secs(31));
    let mut live = login(&service).await;

    assert_eq!(service.prune_expired_tokens().await.unwrap(), 2);
    assert_eq!(service.store().inner.token_count(), 1);
    assert_eq!(service.prune_expired_tokens().await.unwrap(), 0);
    service.check_balance(&mut live).await.unwrap();
}

#[tokio::test]
async fn test_profile_of_current_session() {
    let (service, _) = service(ServiceConfig::default());
    let registered = register(&service).await;
    let mut ctx = login(&service).await;

    let profile = service.profile(&mut ctx).await.unwrap();
    assert_eq!(profile, registered);

    let err = service
        .profile(&mut SessionContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AccountError::NotAuthenticated));
}

#[tokio::test]
async fn test_custom_starting_balance() {
    let (service, _) = service(ServiceConfig::default().starting_balance(250));
    let profile = register(&service).await;
    assert_eq!(profile.balance, 250);

    let mut ctx = login(&service).await;
    assert_eq!(service.check_balance(&mut ctx).await.unwrap().balance, 250);
}
