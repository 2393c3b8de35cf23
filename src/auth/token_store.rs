//! Session secret persistence
//!
//! The Appwrite session secret is kept in the operating system's credential
//! store (Keychain on macOS, Secret Service on Linux, Credential Manager on
//! Windows), serialized as JSON together with the time it was saved.
//! [`MemorySecretStore`] keeps it in process memory instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{OdiaLinguaError, Result};

/// A stored Appwrite session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Session secret sent as `X-Appwrite-Session`
    pub secret: String,
    /// When the secret was saved
    pub saved_at: DateTime<Utc>,
}

impl StoredSession {
    /// Wraps a secret saved now
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            saved_at: Utc::now(),
        }
    }
}

/// Where session secrets live, one per Appwrite project
pub trait SecretStore: Send + Sync {
    /// Saves the session for `project_id`, replacing any previous one
    fn save(&self, project_id: &str, session: &StoredSession) -> Result<()>;

    /// Loads the session for `project_id`; `Ok(None)` when none is saved
    fn load(&self, project_id: &str) -> Result<Option<StoredSession>>;

    /// Forgets the session for `project_id`; a no-op when none is saved
    fn delete(&self, project_id: &str) -> Result<()>;
}

/// Stateless accessor for the OS native keyring
///
/// # Examples
///
/// ```no_run
/// use odialingua::auth::{KeyringSecretStore, SecretStore, StoredSession};
///
/// let store = KeyringSecretStore;
/// store.save("odialingua", &StoredSession::new("secret")).unwrap();
/// assert!(store.load("odialingua").unwrap().is_some());
/// ```
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    /// Keyring service name for `project_id`
    fn service_name(project_id: &str) -> String {
        format!("odialingua-appwrite-{}", project_id)
    }

    fn entry(project_id: &str) -> Result<keyring::Entry> {
        let service = Self::service_name(project_id);
        keyring::Entry::new(&service, project_id)
            .map_err(|e| OdiaLinguaError::Keyring(e).into())
    }
}

impl SecretStore for KeyringSecretStore {
    fn save(&self, project_id: &str, session: &StoredSession) -> Result<()> {
        let json_str = serde_json::to_string(session)?;
        Self::entry(project_id)?
            .set_password(&json_str)
            .map_err(OdiaLinguaError::Keyring)?;
        tracing::debug!(project_id, "Saved session secret to keyring");
        Ok(())
    }

    fn load(&self, project_id: &str) -> Result<Option<StoredSession>> {
        match Self::entry(project_id)?.get_password() {
            Ok(json_str) => Ok(Some(serde_json::from_str(&json_str)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(OdiaLinguaError::Keyring(e).into()),
        }
    }

    fn delete(&self, project_id: &str) -> Result<()> {
        match Self::entry(project_id)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(OdiaLinguaError::Keyring(e).into()),
        }
    }
}

/// Process-local secret store
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl MemorySecretStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `secret` for `project_id`
    pub fn with_secret(project_id: &str, secret: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut sessions) = store.sessions.lock() {
            sessions.insert(project_id.to_string(), StoredSession::new(secret));
        }
        store
    }

    fn sessions(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredSession>>> {
        self.sessions
            .lock()
            .map_err(|_| OdiaLinguaError::Auth("secret store lock poisoned".to_string()).into())
    }
}

impl SecretStore for MemorySecretStore {
    fn save(&self, project_id: &str, session: &StoredSession) -> Result<()> {
        self.sessions()?
            .insert(project_id.to_string(), session.clone());
        Ok(())
    }

    fn load(&self, project_id: &str) -> Result<Option<StoredSession>> {
        Ok(self.sessions()?.get(project_id).cloned())
    }

    fn delete(&self, project_id: &str) -> Result<()> {
        self.sessions()?.remove(project_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_is_namespaced() {
        assert_eq!(
            KeyringSecretStore::service_name("proj"),
            "odialingua-appwrite-proj"
        );
    }

    #[test]
    fn test_stored_session_json_roundtrip() {
        let session = StoredSession::new("abc");
        let json = serde_json::to_string(&session).unwrap();
        let back: StoredSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemorySecretStore::new();
        assert!(store.load("p").unwrap().is_none());

        store.save("p", &StoredSession::new("s1")).unwrap();
        assert_eq!(store.load("p").unwrap().unwrap().secret, "s1");
        assert!(store.load("other").unwrap().is_none());

        store.delete("p").unwrap();
        store.delete("p").unwrap();
        assert!(store.load("p").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_preloaded() {
        let store = MemorySecretStore::with_secret("p", "s2");
        assert_eq!(store.load("p").unwrap().unwrap().secret, "s2");
    }
}
