//! GoTrue authentication provider.

use std::sync::Arc;

use async_trait::async_trait;
use kodbank_core::{Clock, SystemClock};
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::error::AccountError;
use crate::model::{Credentials, Identity, ProviderSession, SignUp};
use crate::session::SessionContext;
use crate::traits::AuthProvider;

use super::api::HttpApi;
use super::wire;

/// Authentication provider backed by a hosted GoTrue API.
///
/// Password rules and email confirmation are the project's settings. An
/// expired context session is refreshed with its refresh token.
pub struct HttpAuthProvider {
    api: HttpApi,
    clock: Arc<dyn Clock>,
}

impl HttpAuthProvider {
    /// Create a provider over `api` on the system clock.
    pub fn new(api: HttpApi) -> Self {
        Self {
            api,
            clock: Arc::new(SystemClock),
        }
    }

    /// Builder: read time from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn grant<B: serde::Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
        fallback_email: &str,
    ) -> Result<ProviderSession, AccountError> {
        let request = self
            .api
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", grant_type)])
            .json(body);
        let session: wire::Session = self.api.send_json(request).await?;
        Ok(session.into_provider_session(self.clock.now_unix(), fallback_email))
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn create_identity(&self, credentials: &Credentials) -> Result<SignUp, AccountError> {
        let request = self
            .api
            .request(Method::POST, "/auth/v1/signup", None)
            .json(&wire::PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            });

        match self.api.send_json(request).await? {
            wire::SignUpResponse::Session(session) => {
                let session =
                    session.into_provider_session(self.clock.now_unix(), &credentials.email);
                Ok(SignUp {
                    identity: session.identity.clone(),
                    session: Some(session),
                })
            }
            wire::SignUpResponse::User(user) => {
                // Enumeration protection answers a taken email with a fake user
                if user.identities.as_ref().is_some_and(Vec::is_empty) {
                    return Err(AccountError::CredentialConflict);
                }
                debug!(identity = %user.id, "identity created pending confirmation");
                Ok(SignUp {
                    identity: user.into_identity(&credentials.email),
                    session: None,
                })
            }
        }
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<ProviderSession, AccountError> {
        self.grant(
            "password",
            &wire::PasswordGrant {
                email: &credentials.email,
                password: &credentials.password,
            },
            &credentials.email,
        )
        .await
    }

    async fn current_session(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<Option<ProviderSession>, AccountError> {
        let Some(session) = ctx.session().cloned() else {
            return Ok(None);
        };
        if !session.is_expired(self.clock.now_unix()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            ctx.clear();
            return Ok(None);
        };
        let refreshed = self
            .grant(
                "refresh_token",
                &wire::RefreshGrant { refresh_token },
                &session.identity.email,
            )
            .await;

        match refreshed {
            Ok(fresh) => {
                info!(identity = %fresh.identity.id, "session refreshed");
                ctx.set(fresh.clone());
                Ok(Some(fresh))
            }
            Err(AccountError::InvalidCredentials) => {
                debug!("refresh token rejected");
                ctx.clear();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn end_session(&self, ctx: &mut SessionContext) -> Result<(), AccountError> {
        let Some(session) = ctx.take() else {
            return Ok(());
        };
        let request = self.api.request(
            Method::POST,
            "/auth/v1/logout",
            Some(&session.access_token),
        );
        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "logout call failed; local session dropped");
                return Err(e.into());
            }
        };
        let status = resp.status();
        // 401/403/404: already expired or revoked server-side
        if status.is_success() || matches!(status.as_u16(), 401 | 403 | 404) {
            debug!(status = status.as_u16(), "provider session ended");
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(wire::map_error(status.as_u16(), &body))
    }

    async fn delete_identity(&self, identity: &Identity) -> Result<(), AccountError> {
        let request = self
            .api
            .admin(Method::DELETE, &format!("/auth/v1/admin/users/{}", identity.id))?;
        self.api.send(request).await?;
        info!(identity = %identity.id, "identity deleted");
        Ok(())
    }
}

impl std::fmt::Debug for HttpAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAuthProvider")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}
