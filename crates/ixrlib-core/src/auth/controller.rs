use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{Credentials, Session};
use crate::api::transport::{ApiResponse, Dispatcher, RequestOptions};
use crate::api::ApiError;
use crate::models::{AuthRequest, AuthResponse};

pub const TOKEN_PATH: &str = "/v1/auth/token";
pub const PING_PATH: &str = "/v1/auth/ping";

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying its signature.
/// Anything that doesn't decode yields `None`.
pub fn decode_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let decoded =
        jsonwebtoken::decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| debug!(error = %e, "Token expiry not decodable"))
            .ok()?;
    DateTime::from_timestamp(decoded.claims.exp?, 0)
}

/// Moves a session from unauthenticated to authenticated.
pub struct AuthController {
    dispatcher: Arc<Dispatcher>,
    session: Arc<Session>,
    auth_request: AuthRequest,
}

impl AuthController {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        session: Arc<Session>,
        auth_request: AuthRequest,
    ) -> Self {
        Self {
            dispatcher,
            session,
            auth_request,
        }
    }

    /// The identity used for implicit logins.
    pub fn auth_request(&self) -> &AuthRequest {
        &self.auth_request
    }

    /// Exchange `request` for a token/secret pair and install it.
    ///
    /// On any failure the held credentials are left as they were.
    pub async fn login(&self, request: &AuthRequest) -> Result<(), ApiError> {
        self.exchange(request).await.map_err(|e| {
            error!(error = %e, "Authentication failed");
            e
        })
    }

    async fn exchange(&self, request: &AuthRequest) -> Result<(), ApiError> {
        if let Err(reason) = request.validate() {
            return Err(ApiError::authentication(
                "invalid auth request",
                ApiError::Validation(reason),
            ));
        }

        let session_id = request.effective_session_id(&self.session.session_id());
        let mut outgoing = request.clone();
        outgoing.session_id = Some(session_id.clone()).filter(|id| !id.is_empty());
        let body = serde_json::to_value(&outgoing).map_err(|e| ApiError::Authentication {
            reason: format!("auth request not serializable: {}", e),
            source: None,
        })?;

        let response = self
            .dispatcher
            .send(Method::POST, TOKEN_PATH, Some(&body), &RequestOptions::default())
            .await
            .map_err(|e| ApiError::authentication("token exchange failed", e))?;

        let AuthResponse { token, secret } = response
            .into_typed::<AuthResponse>()
            .map(|r| r.data)
            .map_err(|e| ApiError::Authentication {
                reason: format!("malformed token response: {}", e),
                source: None,
            })?;
        if token.is_empty() || secret.is_empty() {
            return Err(ApiError::Authentication {
                reason: "token response is missing the token or secret".to_string(),
                source: None,
            });
        }

        let expires_at = decode_expiry(&token);
        self.session.install(Credentials {
            token,
            secret,
            session_id,
            expires_at,
        });
        info!(?expires_at, "Authentication successful");
        Ok(())
    }

    /// Log in with the configured identity unless a pair is already held.
    ///
    /// Only absence triggers a login; an expired pair is reused as is.
    pub async fn ensure_authenticated(&self) -> Result<(), ApiError> {
        if self.session.has_credentials() {
            return Ok(());
        }
        info!("No credentials found, authenticating");
        self.login(&self.auth_request).await
    }

    /// Authenticated health check against the service.
    pub async fn ping(&self) -> Result<ApiResponse, ApiError> {
        self.ensure_authenticated().await?;
        self.dispatcher
            .send(Method::GET, PING_PATH, None, &RequestOptions::default())
            .await
            .map_err(|e| {
                error!(error = %e, "Ping failed");
                ApiError::authentication("ping failed", e)
            })
    }
}
