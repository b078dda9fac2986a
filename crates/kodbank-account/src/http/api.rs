//! Shared HTTP client for the hosted API.

use std::time::Duration;

use kodbank_config::HttpConfig;
use kodbank_core::defaults::DEFAULT_HTTP_TIMEOUT_SECS;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::AccountError;

use super::provider::HttpAuthProvider;
use super::store::HttpRecordStore;
use super::wire;

/// Base URL, keys and connection pool of a hosted project.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    api_key: String,
    service_role_key: Option<String>,
}

impl HttpApi {
    /// Create a client with the default request timeout.
    ///
    /// `base_url` is the project URL (e.g. `https://abc.supabase.co`),
    /// `api_key` the public (anon) key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, AccountError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Create with a custom reqwest [`Client`] (for timeouts, proxies, etc.).
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base = base_url.into();
        Self {
            client,
            base_url: base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_role_key: None,
        }
    }

    /// Build from the `[http]` section of a config file.
    pub fn from_config(config: &HttpConfig) -> Result<Self, AccountError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let mut api = Self::with_client(client, &config.url, &config.api_key);
        api.service_role_key = config.service_role_key.clone();
        Ok(api)
    }

    /// Builder: set the service-role key.
    pub fn service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    /// A GoTrue provider over this project.
    pub fn auth_provider(&self) -> HttpAuthProvider {
        HttpAuthProvider::new(self.clone())
    }

    /// A PostgREST record store over this project.
    pub fn record_store(&self) -> HttpRecordStore {
        HttpRecordStore::new(self.clone())
    }

    /// Project base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A request carrying the `apikey` header and a bearer token.
    ///
    /// `bearer` defaults to the anon key.
    pub(crate) fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let bearer = bearer.unwrap_or(&self.api_key);
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    /// A request authorized with the service-role key when configured.
    pub(crate) fn privileged(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path, self.service_role_key.as_deref())
    }

    /// A request that requires the service-role key.
    pub(crate) fn admin(&self, method: Method, path: &str) -> Result<RequestBuilder, AccountError> {
        let key = self
            .service_role_key
            .as_deref()
            .ok_or(AccountError::Unsupported("admin call without a service-role key"))?;
        Ok(self.request(method, path, Some(key)))
    }

    /// Send a request; non-2xx answers become [`AccountError`]s.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, AccountError> {
        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(wire::map_error(status.as_u16(), &body))
    }

    /// Send a request and decode its JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, AccountError> {
        Ok(self.send(request).await?.json().await?)
    }
}

// Debug implementation (don't leak keys)
impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url)
            .field("service_role", &self.service_role_key.is_some())
            .finish_non_exhaustive()
    }
}
