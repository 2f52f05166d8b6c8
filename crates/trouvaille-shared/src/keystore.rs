//! Per-chat symmetric key storage.
//!
//! Chat keys never leave the device: there is no server copy and no
//! exchange protocol between participants. The [`KeyStore`] trait is an
//! explicit capability injected wherever the codec is used, so nothing in
//! the codebase reaches for key material ambiently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use directories::ProjectDirs;

use crate::constants::CHAT_KEY_SIZE;
use crate::crypto::ChatKey;
use crate::error::KeyStoreError;
use crate::types::ChatId;

pub trait KeyStore: Send + Sync {
    /// Look up the key for a chat, if one has been generated on this device.
    fn get(&self, chat_id: ChatId) -> Result<Option<ChatKey>, KeyStoreError>;

    /// Persist (or replace) the key for a chat.
    fn put(&self, chat_id: ChatId, key: &ChatKey) -> Result<(), KeyStoreError>;

    /// Erase the key for a chat. Erasing a missing key is not an error.
    fn delete(&self, chat_id: ChatId) -> Result<(), KeyStoreError>;
}

/// File-backed key store.
///
/// Each chat's key lives in its own file named `chat_key_{chat_id}` under
/// the platform data directory, containing the base64-encoded 32-byte key.
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    /// Open (or create) the default key store under the platform data dir:
    /// - Linux:   `~/.local/share/trouvaille/keys/`
    /// - macOS:   `~/Library/Application Support/com.trouvaille.trouvaille/keys/`
    pub fn new() -> Result<Self, KeyStoreError> {
        let project_dirs =
            ProjectDirs::from("com", "trouvaille", "trouvaille").ok_or(KeyStoreError::NoDataDir)?;
        Self::open_at(&project_dirs.data_dir().join("keys"))
    }

    /// Open (or create) a key store at an explicit directory.
    ///
    /// Useful for tests and embedded layouts.
    pub fn open_at(dir: &Path) -> Result<Self, KeyStoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn key_path(&self, chat_id: ChatId) -> PathBuf {
        self.dir.join(chat_id.key_name())
    }
}

impl KeyStore for FileKeyStore {
    fn get(&self, chat_id: ChatId) -> Result<Option<ChatKey>, KeyStoreError> {
        let path = self.key_path(chat_id);
        let encoded = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| KeyStoreError::MalformedKey(e.to_string()))?;
        if bytes.len() != CHAT_KEY_SIZE {
            return Err(KeyStoreError::MalformedKey(format!(
                "expected {} bytes, got {}",
                CHAT_KEY_SIZE,
                bytes.len()
            )));
        }

        let mut key = [0u8; CHAT_KEY_SIZE];
        key.copy_from_slice(&bytes);
        Ok(Some(key))
    }

    fn put(&self, chat_id: ChatId, key: &ChatKey) -> Result<(), KeyStoreError> {
        std::fs::write(self.key_path(chat_id), BASE64.encode(key))?;
        Ok(())
    }

    fn delete(&self, chat_id: ChatId) -> Result<(), KeyStoreError> {
        match std::fs::remove_file(self.key_path(chat_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory key store, for tests and for processes that never persist
/// chat keys (the server holds none).
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<ChatId, ChatKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryKeyStore {
    fn locked(&self) -> Result<std::sync::MutexGuard<'_, HashMap<ChatId, ChatKey>>, KeyStoreError> {
        self.keys.lock().map_err(|_| KeyStoreError::Poisoned)
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, chat_id: ChatId) -> Result<Option<ChatKey>, KeyStoreError> {
        Ok(self.locked()?.get(&chat_id).copied())
    }

    fn put(&self, chat_id: ChatId, key: &ChatKey) -> Result<(), KeyStoreError> {
        self.locked()?.insert(chat_id, *key);
        Ok(())
    }

    fn delete(&self, chat_id: ChatId) -> Result<(), KeyStoreError> {
        self.locked()?.remove(&chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_chat_key;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::open_at(dir.path()).unwrap();
        let chat_id = ChatId::new();
        let key = generate_chat_key();

        assert!(store.get(chat_id).unwrap().is_none());
        store.put(chat_id, &key).unwrap();
        assert_eq!(store.get(chat_id).unwrap(), Some(key));
    }

    #[test]
    fn test_file_store_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::open_at(dir.path()).unwrap();
        let chat_id = ChatId::new();

        store.put(chat_id, &generate_chat_key()).unwrap();
        store.delete(chat_id).unwrap();
        assert!(store.get(chat_id).unwrap().is_none());

        // Deleting again is fine
        store.delete(chat_id).unwrap();
    }

    #[test]
    fn test_file_store_naming() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::open_at(dir.path()).unwrap();
        let chat_id = ChatId::new();

        store.put(chat_id, &generate_chat_key()).unwrap();
        assert!(dir.path().join(format!("chat_key_{}", chat_id)).exists());
    }

    #[test]
    fn test_file_store_malformed_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::open_at(dir.path()).unwrap();
        let chat_id = ChatId::new();

        std::fs::write(dir.path().join(chat_id.key_name()), "dG9vIHNob3J0").unwrap();
        assert!(store.get(chat_id).is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryKeyStore::new();
        let chat_id = ChatId::new();
        let key = generate_chat_key();

        store.put(chat_id, &key).unwrap();
        assert_eq!(store.get(chat_id).unwrap(), Some(key));
        store.delete(chat_id).unwrap();
        assert!(store.get(chat_id).unwrap().is_none());
    }
}
