use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use keyring::Entry;
use parking_lot::Mutex;

/// Keychain service name for `KeyringStorage` entries
const SERVICE_NAME: &str = "storefront";

/// Backing store for the persisted session.
///
/// Values are opaque strings addressed by key. Reading a key that was never
/// written yields `None`, and removing it is not an error.
pub trait SessionStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: SessionStorage + ?Sized> SessionStorage for Arc<S> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        (**self).write(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// One file per key inside a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SessionStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session key: {}", key))?;
        Ok(Some(contents))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
        std::fs::write(self.key_path(key), value)
            .with_context(|| format!("Failed to write session key: {}", key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove session key: {}", key))?;
        }
        Ok(())
    }
}

/// One OS keychain entry per key.
///
/// Entries are created once per key and reused, so every read sees the
/// credential object the last write went through.
pub struct KeyringStorage {
    service: String,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different keychain service name (separate profiles, tests)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &str) -> Result<Arc<Entry>> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            return Ok(entry.clone());
        }
        let entry = Arc::new(Entry::new(&self.service, key).context("Failed to create keyring entry")?);
        entries.insert(key.to_string(), entry.clone());
        Ok(entry)
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session key from keychain"),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store session key in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session key from keychain"),
        }
    }
}

/// In-process storage; nothing survives the process.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path().join("session"));

        assert_eq!(storage.read("access").unwrap(), None);
        storage.write("access", "A1").unwrap();
        assert_eq!(storage.read("access").unwrap().as_deref(), Some("A1"));

        storage.remove("access").unwrap();
        assert_eq!(storage.read("access").unwrap(), None);
        // Removing again is fine
        storage.remove("access").unwrap();
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());
        storage.write("refresh", "R1").unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.read("refresh").unwrap().as_deref(), Some("R1"));
        storage.remove("refresh").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_keyring_storage_round_trip() {
        // The mock store keeps values per entry object, so this also checks
        // that entries are reused between calls.
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        let storage = KeyringStorage::with_service("storefront-test");

        assert_eq!(storage.read("access").unwrap(), None);
        storage.write("access", "A1").unwrap();
        assert_eq!(storage.read("access").unwrap().as_deref(), Some("A1"));
        storage.write("access", "A2").unwrap();
        assert_eq!(storage.read("access").unwrap().as_deref(), Some("A2"));

        storage.remove("access").unwrap();
        assert_eq!(storage.read("access").unwrap(), None);
        storage.remove("access").unwrap();
    }

    #[test]
    fn test_keyring_backed_session_survives_reopen() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        let storage = Arc::new(KeyringStorage::with_service("storefront-session-test"));
        let store = crate::auth::SessionStore::open(storage.clone());
        store
            .establish(
                crate::models::Identity {
                    id: 1,
                    username: "alice".to_string(),
                    email: "alice@example.com".to_string(),
                    is_admin: false,
                },
                "A1".to_string(),
                "R1".to_string(),
            )
            .unwrap();

        let reopened = crate::auth::SessionStore::open(storage);
        assert_eq!(reopened.access_credential().as_deref(), Some("A1"));
        assert_eq!(reopened.refresh_credential().as_deref(), Some("R1"));
    }
}
