//! Wire models for the iXRLib service.
//!
//! This module contains the payloads exchanged with the service:
//!
//! - `AuthRequest`, `AuthResponse`: the token exchange
//! - `EventBatch`, `LogBatch`, `TelemetryBatch`: collection payloads
//! - `Prompt`: LLM proxy requests
//! - `StorageBatch`: persisted application data
//!
//! All fields are camelCase on the wire.

pub mod auth;
pub mod collect;
pub mod services;
pub mod storage;

pub use auth::{AuthRequest, AuthResponse};
pub use collect::{Event, EventBatch, LogBatch, LogEntry, TelemetryBatch, TelemetryEntry};
pub use services::{Message, Prompt};
pub use storage::{StorageBatch, StorageEntry};
