//! The sign → dispatch → retry pipeline shared by every outbound call.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::retry::{RetryPolicy, Sleeper};
use super::ApiError;
use crate::auth::{signer, Session};

/// Normalized response, independent of the transport's own response type.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T = Value> {
    pub data: T,
    pub status: StatusCode,
    pub status_text: String,
}

impl ApiResponse {
    /// Deserialize `data` into a concrete payload type.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, serde_json::Error> {
        Ok(ApiResponse {
            data: serde_json::from_value(self.data)?,
            status: self.status,
            status_text: self.status_text,
        })
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Replaces the configured timeout for this call only
    pub timeout: Option<Duration>,
    /// Sent along with the signature headers; the signature wins on conflict
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Body text into JSON: empty is `Null`, anything unparseable stays a string.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

pub(crate) struct Dispatcher {
    http: Client,
    base_url: Url,
    session: Arc<Session>,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    timeout: Duration,
}

impl Dispatcher {
    pub(crate) fn new(
        http: Client,
        base_url: Url,
        session: Arc<Session>,
        retry: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url,
            session,
            retry,
            sleeper,
            timeout,
        }
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, method: &Method, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Validation(format!("{} {}: invalid path: {}", method, path, e)))
    }

    /// Headers for one attempt: caller extras, then the signature computed
    /// from the credentials held right now. Without credentials the call
    /// goes out unsigned.
    fn headers_for(
        &self,
        body: Option<&[u8]>,
        options: &RequestOptions,
    ) -> Result<HeaderMap, ApiError> {
        let mut headers = options.headers.clone();
        if body.is_some() {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        match self.session.credentials() {
            Some(credentials) => {
                let signed = signer::sign(&credentials, body, Utc::now().timestamp());
                let signed = signed.to_header_map().map_err(|_| {
                    ApiError::Validation(
                        "stored token cannot be sent as a header value".to_string(),
                    )
                })?;
                headers.extend(signed);
            }
            None => debug!("No credentials held, sending request unsigned"),
        }
        Ok(headers)
    }

    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&method, path)?;
        // Serialized once: these exact bytes are both signed and sent
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| {
                ApiError::Validation(format!("{} {}: unserializable body: {}", method, path, e))
            })?;
        let timeout = options.timeout.unwrap_or(self.timeout);

        let mut attempt: u32 = 0;
        loop {
            let headers = self.headers_for(body.as_deref(), options)?;
            let mut builder = self
                .http
                .request(method.clone(), url.clone())
                .headers(headers)
                .timeout(timeout);
            if let Some(ref bytes) = body {
                builder = builder.body(bytes.clone());
            }

            debug!(%method, path, attempt, "Sending request");
            let response = match builder.send().await {
                Ok(response) => response,
                Err(source) => {
                    error!(
                        %method,
                        path,
                        attempt,
                        error = %source,
                        "Request failed without a response"
                    );
                    return Err(ApiError::Transport {
                        method,
                        path: path.to_string(),
                        source,
                    });
                }
            };

            let status = response.status();
            if status.is_success() {
                let text = response.text().await.map_err(|source| ApiError::Transport {
                    method: method.clone(),
                    path: path.to_string(),
                    source,
                })?;
                debug!(%method, path, %status, "Request succeeded");
                return Ok(ApiResponse {
                    data: parse_body(text),
                    status,
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                });
            }

            let text = response.text().await.unwrap_or_default();
            if self.retry.should_retry(attempt, Some(status.as_u16())) {
                let delay = self.retry.delay_for(attempt);
                warn!(
                    %method,
                    path,
                    %status,
                    retry = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable status, backing off"
                );
                self.sleeper.sleep(delay).await;
                attempt += 1;
                continue;
            }

            error!(%method, path, %status, attempt, "Request failed");
            let detail = ApiError::truncate_body(&text);
            let retryable = self
                .retry
                .config()
                .retryable_status_codes
                .contains(&status.as_u16());
            return Err(if retryable {
                ApiError::RetryExhausted {
                    method,
                    path: path.to_string(),
                    status,
                    retries: attempt,
                    body: detail,
                }
            } else {
                ApiError::Server {
                    method,
                    path: path.to_string(),
                    status,
                    body: detail,
                }
            });
        }
    }
}
