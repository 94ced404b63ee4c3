// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Secure Storage Module
//!
//! Holds the device master key. Uses the OS keychain when the
//! `secure-storage` feature is enabled, otherwise a file inside the app
//! sandbox readable only by the owning user.

use crate::storage::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;

/// Trait for secure storage of cryptographic keys.
pub trait SecureStorage: Send + Sync {
    /// Saves a key to secure storage, overwriting any previous value.
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError>;

    /// Loads a key from secure storage.
    /// Returns None if the key doesn't exist.
    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Deletes a key from secure storage.
    fn delete_key(&self, name: &str) -> Result<(), StorageError>;

    /// Checks if a key exists in secure storage.
    fn has_key(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.load_key(name)?.is_some())
    }
}

/// Platform keyring implementation using the `keyring` crate.
/// Available when the `secure-storage` feature is enabled.
#[cfg(feature = "secure-storage")]
pub struct PlatformKeyring {
    service: String,
}

#[cfg(feature = "secure-storage")]
impl PlatformKeyring {
    /// Creates a new platform keyring accessor.
    ///
    /// # Arguments
    /// * `service` - The service name to use for keychain entries (e.g., "billsync")
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, name: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, name)
            .map_err(|e| StorageError::Unavailable(format!("Keyring error: {}", e)))
    }
}

#[cfg(feature = "secure-storage")]
impl SecureStorage for PlatformKeyring {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.entry(name)?
            .set_secret(key)
            .map_err(|e| StorageError::Unavailable(format!("Failed to save to keychain: {}", e)))
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.entry(name)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Unavailable(format!(
                "Failed to load from keychain: {}",
                e
            ))),
        }
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        match self.entry(name)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(StorageError::Unavailable(format!(
                "Failed to delete from keychain: {}",
                e
            ))),
        }
    }
}

/// File-based key storage for platforms without a keychain.
///
/// One file per key inside `path`. Confidentiality rests on the app sandbox
/// and the owner-only file mode.
pub struct FileKeyStorage {
    path: PathBuf,
}

impl FileKeyStorage {
    /// Creates a new file-based key storage rooted at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn key_file_path(&self, name: &str) -> PathBuf {
        // Sanitize the name to prevent path traversal
        let safe_name = name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect::<String>();
        self.path.join(format!("{}.key", safe_name))
    }
}

impl SecureStorage for FileKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.path)
            .map_err(|e| StorageError::Unavailable(format!("Failed to create directory: {}", e)))?;

        let file_path = self.key_file_path(name);
        std::fs::write(&file_path, key)
            .map_err(|e| StorageError::Unavailable(format!("Failed to write key file: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&file_path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| StorageError::Unavailable(format!("Failed to restrict key file: {}", e)),
            )?;
        }

        Ok(())
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let file_path = self.key_file_path(name);

        if !file_path.exists() {
            return Ok(None);
        }

        let key = std::fs::read(&file_path)
            .map_err(|e| StorageError::Unavailable(format!("Failed to read key file: {}", e)))?;

        Ok(Some(key))
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        let file_path = self.key_file_path(name);

        if file_path.exists() {
            std::fs::remove_file(&file_path).map_err(|e| {
                StorageError::Unavailable(format!("Failed to delete key file: {}", e))
            })?;
        }

        Ok(())
    }
}

/// In-memory key storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKeyStorage {
    keys: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStorage for MemoryKeyStorage {
    fn save_key(&self, name: &str, key: &[u8]) -> Result<(), StorageError> {
        self.keys.lock().insert(name.to_string(), key.to_vec());
        Ok(())
    }

    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.keys.lock().get(name).cloned())
    }

    fn delete_key(&self, name: &str) -> Result<(), StorageError> {
        self.keys.lock().remove(name);
        Ok(())
    }
}
