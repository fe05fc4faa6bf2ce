//! API client for the iXRLib telemetry and analytics service.
//!
//! This module provides the `ApiClient` struct. Every call goes through
//! the same pipeline: log in if no credentials are held, sign with the
//! credentials held right now, dispatch, and back off on retryable
//! statuses.

use std::sync::Arc;

use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use super::transport::{ApiResponse, Dispatcher, RequestOptions};
use super::ApiError;
use crate::auth::{AuthController, CredentialStore, Session};
use crate::config::ClientConfig;
use crate::models::AuthRequest;

/// API client for iXRLib.
/// Clone is cheap - the session, connection pool and controller are shared.
#[derive(Clone)]
pub struct ApiClient {
    dispatcher: Arc<Dispatcher>,
    auth: Arc<AuthController>,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a client keeping its credentials in memory only.
    pub fn new(config: ClientConfig, auth_request: AuthRequest) -> Result<Self, ApiError> {
        Self::builder(auth_request).config(config).build()
    }

    pub fn builder(auth_request: AuthRequest) -> ApiClientBuilder {
        ApiClientBuilder::new(auth_request)
    }

    /// Issue a call to `path`, relative to the configured base URL.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        self.request_with(method, path, body, &RequestOptions::default())
            .await
    }

    pub async fn request_with(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        self.auth.ensure_authenticated().await?;
        self.dispatcher.send(method, path, body, options).await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        let body = Self::to_json(&Method::POST, path, body)?;
        self.request(Method::POST, path, Some(&body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        let body = Self::to_json(&Method::PUT, path, body)?;
        self.request(Method::PUT, path, Some(&body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.request(Method::DELETE, path, None).await
    }

    fn to_json<B: Serialize + ?Sized>(
        method: &Method,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        serde_json::to_value(body).map_err(|e| {
            ApiError::Validation(format!("{} {}: unserializable body: {}", method, path, e))
        })
    }

    pub fn auth_controller(&self) -> &AuthController {
        &self.auth
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        self.dispatcher.base_url()
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    auth_request: AuthRequest,
    config: ClientConfig,
    store: Option<CredentialStore>,
    sleeper: Arc<dyn Sleeper>,
}

impl ApiClientBuilder {
    fn new(auth_request: AuthRequest) -> Self {
        Self {
            auth_request,
            config: ClientConfig::default(),
            store: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Backing store for credentials; in-memory when unset.
    pub fn store(mut self, store: CredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// How retry backoff delays are awaited.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Fails with `ApiError::Validation` before touching the network when
    /// the auth request or configuration is unusable.
    pub fn build(self) -> Result<ApiClient, ApiError> {
        self.auth_request.validate().map_err(ApiError::Validation)?;
        let base_url = parse_base_url(&self.config.base_url)?;

        let http = Client::builder()
            .timeout(self.config.timeout())
            .build()
            .map_err(|e| ApiError::Validation(format!("HTTP client setup failed: {}", e)))?;

        let store = self.store.unwrap_or_else(CredentialStore::in_memory);
        let session = Arc::new(Session::load(store));
        let dispatcher = Arc::new(Dispatcher::new(
            http,
            base_url,
            session.clone(),
            RetryPolicy::new(self.config.retry.clone()),
            self.sleeper,
            self.config.timeout(),
        ));
        let auth = Arc::new(AuthController::new(
            dispatcher.clone(),
            session.clone(),
            self.auth_request,
        ));

        debug!(base_url = %dispatcher.base_url(), "API client ready");
        Ok(ApiClient {
            dispatcher,
            auth,
            session,
        })
    }
}

/// Parse the service root, making sure relative paths join beneath it.
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized)
        .map_err(|e| ApiError::Validation(format!("invalid base URL {:?}: {}", raw, e)))
}
