use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use tracing::{debug, warn};

use super::Credentials;

/// Keychain service name for [`KeyringStore`]
const SERVICE_NAME: &str = "ixrlib";

/// Credential file name for [`FileStore`]
const CREDENTIALS_FILE: &str = "credentials.json";

pub const KEY_API_TOKEN: &str = "apiToken";
pub const KEY_API_SECRET: &str = "apiSecret";
pub const KEY_SESSION_ID: &str = "sessionId";
pub const KEY_TOKEN_EXPIRATION: &str = "tokenExpiration";

/// Persistent string key-value medium backing the credential store.
///
/// Reads never fail: an unavailable medium reads as `None`, which the
/// client treats as "not authenticated".
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store. Credentials live as long as the process does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// JSON map persisted to a single file, surviving process restarts.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `credentials.json` inside the given cache directory.
    pub fn in_dir(cache_dir: PathBuf) -> Self {
        Self::new(cache_dir.join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read credentials file")?;
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        // Readers in other processes only ever see a complete file
        let staging = self.staging_path();
        std::fs::write(&staging, contents).context("Failed to write credentials file")?;
        std::fs::rename(&staging, &self.path).context("Failed to replace credentials file")?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read_map() {
            Ok(mut map) => map.remove(key),
            Err(e) => {
                debug!(error = %e, path = ?self.path, "Credential file unreadable");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A corrupt file is replaced rather than blocking new credentials
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map().unwrap_or_default();
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// OS keychain, one entry per key.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Option<String> {
        let entry = self.entry(key).ok()?;
        match entry.get_password() {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!(error = %e, key = key, "Keychain read failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

/// What a backing store held for the session at load time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredSession {
    pub credentials: Option<Credentials>,
    pub session_id: String,
}

/// Maps session credentials onto the four persisted keys.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    fn read(&self, key: &str) -> String {
        self.backend
            .get(key)
            .filter(|value| !value.is_empty())
            .unwrap_or_default()
    }

    pub fn load(&self) -> StoredSession {
        let token = self.read(KEY_API_TOKEN);
        let secret = self.read(KEY_API_SECRET);
        let session_id = self.read(KEY_SESSION_ID);
        let expires_at = self
            .backend
            .get(KEY_TOKEN_EXPIRATION)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|at| at.with_timezone(&Utc));

        // Half a pair is as good as none
        let credentials = if token.is_empty() || secret.is_empty() {
            None
        } else {
            Some(Credentials {
                token,
                secret,
                session_id: session_id.clone(),
                expires_at,
            })
        };

        StoredSession {
            credentials,
            session_id,
        }
    }

    /// Write all keys through to the backend. Failures are logged per key;
    /// the first one is returned after every key has been attempted.
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        let writes = [
            (KEY_API_TOKEN, Some(credentials.token.clone())),
            (KEY_API_SECRET, Some(credentials.secret.clone())),
            (KEY_SESSION_ID, Some(credentials.session_id.clone())),
            (KEY_TOKEN_EXPIRATION, credentials.expires_at.map(|at| at.to_rfc3339())),
        ];

        let mut first_error = None;
        for (key, value) in writes {
            let result = match value {
                Some(value) => self.backend.set(key, &value),
                None => self.backend.remove(key),
            };
            if let Err(e) = result {
                warn!(error = %e, key = key, "Failed to persist credential");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Forget everything persisted for the session.
    pub fn clear(&self) -> Result<()> {
        for key in [KEY_API_TOKEN, KEY_API_SECRET, KEY_SESSION_ID, KEY_TOKEN_EXPIRATION] {
            self.backend.remove(key)?;
        }
        Ok(())
    }
}
