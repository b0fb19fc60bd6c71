//! Key-value store for the client session
//!
//! This module provides a small, type-safe key-value store on top of sled.
//! Values are stored as JSON so that the persisted session survives schema
//! additions on either side.

use serde::{de::DeserializeOwned, Serialize};
use sled::Db;
use std::sync::Arc;
use thiserror::Error;

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Key-value store configuration
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    pub cache_capacity: u64,
    /// Enable compression
    pub use_compression: bool,
    /// Flush interval in milliseconds (None for immediate flush)
    pub flush_every_ms: Option<u64>,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: "library_session.db".to_string(),
            cache_capacity: 4 * 1024 * 1024, // 4MB, the session is tiny
            use_compression: true,
            flush_every_ms: Some(500),
        }
    }
}

impl KvConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Build a configuration from `LMS_SESSION_PATH`, falling back to the default path
    pub fn from_env() -> Self {
        match std::env::var("LMS_SESSION_PATH") {
            Ok(path) if !path.trim().is_empty() => Self::new(path.trim()),
            _ => Self::default(),
        }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// Key-value store implementation
#[derive(Clone)]
pub struct KvStore {
    db: Arc<Db>,
    separator: &'static str,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").field("keys", &self.db.len()).finish()
    }
}

impl KvStore {
    /// Open a key-value store with configuration
    pub fn new(config: KvConfig) -> Result<Self> {
        let mut db_config = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression);

        if let Some(ms) = config.flush_every_ms {
            db_config = db_config.flush_every_ms(Some(ms));
        }

        let db = db_config.open()?;
        tracing::debug!(path = %config.path, "opened session store");

        Ok(Self { db: Arc::new(db), separator: ":" })
    }

    /// Create an in-memory key-value store (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;

        Ok(Self { db: Arc::new(db), separator: ":" })
    }

    /// Get a value by key
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => {
                let value: T = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a value by key
    pub fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        if key.is_empty() {
            return Err(KvError::InvalidKey("key cannot be empty".to_string()));
        }
        let bytes = serde_json::to_vec(value)?;
        self.db.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Remove a value by key
    pub fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.db.remove(key.as_bytes())?.is_some())
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    /// Get all keys with a given prefix
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            if let Ok(key_str) = String::from_utf8(key.to_vec()) {
                keys.push(key_str);
            }
        }

        Ok(keys)
    }

    /// Clear all data
    pub fn clear(&self) -> Result<()> {
        self.db.clear()?;
        Ok(())
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Get a namespaced view of this store (e.g. `scoped("session")`)
    pub fn scoped(&self, scope: impl Into<String>) -> ScopedStore {
        ScopedStore { kv: self.clone(), scope: scope.into() }
    }

    fn scoped_key(&self, scope: &str, key: &str) -> String {
        format!("{}{}{}", scope, self.separator, key)
    }
}

/// A namespaced view over a [`KvStore`]
///
/// Keys are stored as `<scope>:<key>`. Removing the scope removes every key
/// written through this view and nothing else.
#[derive(Debug, Clone)]
pub struct ScopedStore {
    kv: KvStore,
    scope: String,
}

impl ScopedStore {
    /// The namespace of this view
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Get a value in this scope
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.kv.get(&self.kv.scoped_key(&self.scope, key))
    }

    /// Set a value in this scope
    pub fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        if key.is_empty() {
            return Err(KvError::InvalidKey("key cannot be empty".to_string()));
        }
        self.kv.set(&self.kv.scoped_key(&self.scope, key), value)
    }

    /// Remove a value in this scope
    pub fn remove(&self, key: &str) -> Result<bool> {
        self.kv.remove(&self.kv.scoped_key(&self.scope, key))
    }

    /// Remove several values in this scope, returning how many existed
    pub fn remove_many(&self, keys: &[&str]) -> Result<usize> {
        let mut count = 0;
        for key in keys {
            if self.remove(key)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Check if a key exists in this scope
    pub fn contains(&self, key: &str) -> Result<bool> {
        self.kv.contains(&self.kv.scoped_key(&self.scope, key))
    }

    /// Remove every key in this scope
    pub fn clear(&self) -> Result<usize> {
        let prefix = self.kv.scoped_key(&self.scope, "");
        let keys = self.kv.keys_with_prefix(&prefix)?;
        let mut count = 0;
        for key in keys {
            if self.kv.remove(&key)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Flush pending writes of the underlying store
    pub fn flush(&self) -> Result<()> {
        self.kv.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: i64,
        username: String,
    }

    #[test]
    fn test_set_and_get() {
        let store = KvStore::in_memory().unwrap();
        store.set("authToken", &"abc.def.ghi".to_string()).unwrap();

        let value: Option<String> = store.get("authToken").unwrap();
        assert_eq!(value, Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_set_and_get_struct() {
        let store = KvStore::in_memory().unwrap();
        let profile = Profile { id: 7, username: "ada".to_string() };

        store.set("userData", &profile).unwrap();
        let loaded: Option<Profile> = store.get("userData").unwrap();
        assert_eq!(loaded, Some(profile));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = KvStore::in_memory().unwrap();
        let value: Option<String> = store.get("missing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_empty_key_rejected() {
        let store = KvStore::in_memory().unwrap();
        let result = store.set("", &1);
        assert!(matches!(result, Err(KvError::InvalidKey(_))));
    }

    #[test]
    fn test_remove() {
        let store = KvStore::in_memory().unwrap();
        store.set("key", &1).unwrap();
        assert!(store.remove("key").unwrap());
        assert!(!store.remove("key").unwrap());
        assert!(!store.contains("key").unwrap());
    }

    #[test]
    fn test_scoped_store_isolation() {
        let store = KvStore::in_memory().unwrap();
        let session = store.scoped("session");
        let other = store.scoped("prefs");

        session.set("authToken", &"t1".to_string()).unwrap();
        other.set("authToken", &"t2".to_string()).unwrap();

        assert_eq!(session.get::<String>("authToken").unwrap(), Some("t1".to_string()));
        assert_eq!(other.get::<String>("authToken").unwrap(), Some("t2".to_string()));
        assert!(store.contains("session:authToken").unwrap());
    }

    #[test]
    fn test_scoped_clear_leaves_other_scopes() {
        let store = KvStore::in_memory().unwrap();
        let session = store.scoped("session");
        session.set("authToken", &"t".to_string()).unwrap();
        session.set("userData", &Profile { id: 1, username: "a".into() }).unwrap();
        store.set("unrelated", &true).unwrap();

        assert_eq!(session.clear().unwrap(), 2);
        assert!(!session.contains("authToken").unwrap());
        assert!(store.contains("unrelated").unwrap());
    }

    #[test]
    fn test_remove_many() {
        let store = KvStore::in_memory().unwrap();
        let session = store.scoped("session");
        session.set("authToken", &"t".to_string()).unwrap();

        let removed = session.remove_many(&["authToken", "userData"]).unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("session.db");
        let config = KvConfig::new(path.to_string_lossy()).flush_every_ms(None);

        {
            let store = KvStore::new(config.clone()).unwrap();
            store.scoped("session").set("authToken", &"persisted".to_string()).unwrap();
            store.flush().unwrap();
        }

        let reopened = KvStore::new(config).unwrap();
        let token: Option<String> = reopened.scoped("session").get("authToken").unwrap();
        assert_eq!(token, Some("persisted".to_string()));
    }

    #[test]
    fn test_config_builder() {
        let config = KvConfig::new("custom.db")
            .cache_capacity(1024)
            .use_compression(false)
            .flush_every_ms(None);

        assert_eq!(config.path, "custom.db");
        assert_eq!(config.cache_capacity, 1024);
        assert!(!config.use_compression);
        assert!(config.flush_every_ms.is_none());
    }
}
