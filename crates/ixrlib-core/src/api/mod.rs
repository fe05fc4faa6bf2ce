//! REST API client module for the iXRLib service.
//!
//! This module provides the `ApiClient` for communicating with the
//! iXRLib API to submit events, logs and telemetry, query storage and
//! reach the LLM proxy.
//!
//! Requests are authenticated with a bearer token plus a per-request
//! signature derived from the shared secret obtained at login.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod retry;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::ApiError;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use transport::{ApiResponse, RequestOptions};
