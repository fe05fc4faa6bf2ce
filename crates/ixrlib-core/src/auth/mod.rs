//! Authentication module for the session lifecycle and request signing.
//!
//! This module provides:
//! - `Session`: live token/secret pair shared across calls, written through
//!   to a backing store
//! - `CredentialStore`: the four persisted keys over a pluggable
//!   `KeyValueStore` (memory, file, OS keychain)
//! - `signer`: per-request signature headers
//! - `AuthController`: the token exchange and the health ping

pub mod controller;
pub mod credentials;
pub mod session;
pub mod signer;

pub use controller::AuthController;
pub use credentials::{
    CredentialStore, FileStore, KeyValueStore, KeyringStore, MemoryStore, StoredSession,
};
pub use session::{Credentials, Session};
pub use signer::SignedHeaders;
