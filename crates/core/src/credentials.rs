//! Credential pair persistence
//!
//! The access/refresh pair lives under two fixed keys in a synchronous
//! key-value store. Nothing above this layer caches tokens: every read goes
//! back to the store so a write from another client instance is picked up on
//! the next call.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StorageError;

/// Storage key of the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Access and refresh token as issued by the auth endpoints
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Synchronous string key-value store holding the credential pair
pub trait CredentialStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.get(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.get(REFRESH_TOKEN_KEY)
    }

    /// Both tokens, if both are present
    fn credentials(&self) -> Result<Option<CredentialPair>, StorageError> {
        Ok(match (self.access_token()?, self.refresh_token()?) {
            (Some(access), Some(refresh)) => Some(CredentialPair::new(access, refresh)),
            _ => None,
        })
    }

    fn save_credentials(&self, pair: &CredentialPair) -> Result<(), StorageError> {
        self.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.set(REFRESH_TOKEN_KEY, &pair.refresh_token)
    }

    fn clear_credentials(&self) -> Result<(), StorageError> {
        self.remove(ACCESS_TOKEN_KEY)?;
        self.remove(REFRESH_TOKEN_KEY)
    }
}

/// Process-local store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a credential pair
    pub fn with_credentials(pair: &CredentialPair) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(ACCESS_TOKEN_KEY.to_string(), pair.access_token.clone());
        entries.insert(REFRESH_TOKEN_KEY.to_string(), pair.refresh_token.clone());
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write()?.remove(key);
        Ok(())
    }
}

/// JSON file backed store shared between runs of the CLI
///
/// The file is re-read on every access and rewritten atomically through a
/// sibling temp file. Concurrent writers are last-write-wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;

        // Tokens are bearer secrets: owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &self.path)?;
        debug!("Persisted credential store to {}", self.path.display());
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock()?;
        let mut entries = self.load()?;
        f(&mut entries);
        self.persist(&entries)
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn save_credentials(&self, pair: &CredentialPair) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(ACCESS_TOKEN_KEY.to_string(), pair.access_token.clone());
            entries.insert(REFRESH_TOKEN_KEY.to_string(), pair.refresh_token.clone());
        })
    }

    fn clear_credentials(&self) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        info!("Clearing stored credentials at {}", self.path.display());
        self.update(|entries| {
            entries.remove(ACCESS_TOKEN_KEY);
            entries.remove(REFRESH_TOKEN_KEY);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pair() -> CredentialPair {
        CredentialPair::new("access-1", "refresh-1")
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.credentials().unwrap(), None);

        store.save_credentials(&pair()).unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("access-1"));
        assert_eq!(store.credentials().unwrap(), Some(pair()));

        store.clear_credentials().unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_partial_pair_is_not_credentials() {
        let store = MemoryStore::new();
        store.set(REFRESH_TOKEN_KEY, "refresh-only").unwrap();
        assert_eq!(store.credentials().unwrap(), None);
        assert_eq!(
            store.refresh_token().unwrap().as_deref(),
            Some("refresh-only")
        );
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("credentials.json");

        FileStore::new(&path).save_credentials(&pair()).unwrap();
        assert!(path.exists());

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.credentials().unwrap(), Some(pair()));

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("accessToken").map(String::as_str), Some("access-1"));
        assert_eq!(raw.get("refreshToken").map(String::as_str), Some("refresh-1"));
    }

    #[test]
    fn test_file_store_keeps_unrelated_keys_on_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("credentials.json"));

        store.set("cartId", "c-9").unwrap();
        store.save_credentials(&pair()).unwrap();
        store.clear_credentials().unwrap();

        assert_eq!(store.credentials().unwrap(), None);
        assert_eq!(store.get("cartId").unwrap().as_deref(), Some("c-9"));
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("absent.json"));
        assert_eq!(store.access_token().unwrap(), None);
        store.clear_credentials().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        let result = FileStore::new(&path).access_token();
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        FileStore::new(&path).save_credentials(&pair()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", pair());
        assert!(!rendered.contains("access-1"));
        assert!(rendered.contains("redacted"));
    }
}
