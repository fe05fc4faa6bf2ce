use std::sync::{Mutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::credentials::CredentialStore;

/// The token/secret pair issued by a login, plus its session context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub secret: String,
    pub session_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Whether the token's decoded expiry has passed.
    ///
    /// Informational only: requests keep using an expired token until the
    /// server rejects it.
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Utc::now() > at).unwrap_or(false)
    }

    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|at| at - Utc::now())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    credentials: Option<Credentials>,
    // Carried into the next login even when no credentials are held
    session_id: String,
}

/// Live credentials shared by the client, signer and auth controller.
///
/// Every read returns the current value, so a login completed by one call
/// is visible to the next without rebuilding the client. Every install is
/// written through to the backing store.
pub struct Session {
    store: CredentialStore,
    state: RwLock<SessionState>,
    // Held across a store write and the matching in-memory swap, so the
    // persisted pair and the live pair always come from the same login
    write_lock: Mutex<()>,
}

impl Session {
    /// Create a session primed from whatever the store already holds.
    pub fn load(store: CredentialStore) -> Self {
        let stored = store.load();
        debug!(
            has_credentials = stored.credentials.is_some(),
            "Session loaded from credential store"
        );
        Self {
            store,
            state: RwLock::new(SessionState {
                credentials: stored.credentials,
                session_id: stored.session_id,
            }),
            write_lock: Mutex::new(()),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.credentials.clone()
    }

    pub fn has_credentials(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.credentials.is_some()
    }

    pub fn session_id(&self) -> String {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.session_id.clone()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.credentials.as_ref().and_then(|c| c.expires_at)
    }

    /// Replace the live credentials and persist them.
    ///
    /// Persistence failures are logged and swallowed: the in-memory pair
    /// stays authoritative for this process.
    pub fn install(&self, credentials: Credentials) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.store.save(&credentials) {
            warn!(error = %e, "Failed to persist session credentials");
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.session_id = credentials.session_id.clone();
        state.credentials = Some(credentials);
    }

    /// Drop the live credentials and erase them from the store.
    pub fn clear(&self) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = SessionState::default();
        }
        self.store.clear()
    }
}
