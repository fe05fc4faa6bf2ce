//! Client library for the iXRLib telemetry and analytics service.
//!
//! The [`ApiClient`] logs in on first use, signs every request with the
//! session's shared secret, retries transient failures with exponential
//! backoff, and keeps the session in a pluggable credential store so it
//! survives across calls and processes.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ApiResponse, RequestOptions};
pub use auth::{CredentialStore, Credentials, FileStore, KeyringStore, MemoryStore, Session};
pub use config::{ClientConfig, RetryConfig};
pub use models::AuthRequest;
