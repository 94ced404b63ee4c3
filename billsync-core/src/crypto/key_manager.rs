// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device master key lifecycle.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::encryption::{SymmetricKey, KEY_SIZE};
use crate::storage::{SecureStorage, StorageError};

/// Lazily creates and returns the device-local 256-bit master key.
///
/// The key is cached after the first successful read. [`KeyManager::invalidate`]
/// drops the cache and must be called by whoever overwrites the stored key.
pub struct KeyManager {
    storage: Arc<dyn SecureStorage>,
    key_id: String,
    cached: Mutex<Option<SymmetricKey>>,
}

impl KeyManager {
    pub fn new(storage: Arc<dyn SecureStorage>, key_id: impl Into<String>) -> Self {
        Self {
            storage,
            key_id: key_id.into(),
            cached: Mutex::new(None),
        }
    }

    /// Returns the stored master key, generating and persisting one on first use.
    ///
    /// Storage failures are returned as-is; a key is never made up on the fly,
    /// since a different key per call would strand earlier ciphertext.
    pub fn get_or_create_key(&self) -> Result<SymmetricKey, StorageError> {
        // Held across load-and-create so two first callers can't each persist a key.
        let mut cached = self.cached.lock();
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }

        let key = match self.storage.load_key(&self.key_id)? {
            Some(bytes) => SymmetricKey::from_slice(&bytes).ok_or_else(|| {
                StorageError::Encryption(format!(
                    "stored master key has {} bytes, expected {}",
                    bytes.len(),
                    KEY_SIZE
                ))
            })?,
            None => {
                let key = SymmetricKey::generate()
                    .map_err(|e| StorageError::Encryption(e.to_string()))?;
                self.storage.save_key(&self.key_id, key.as_bytes())?;
                info!(key_id = %self.key_id, "generated new device master key");
                key
            }
        };

        *cached = Some(key.clone());
        Ok(key)
    }

    /// Forgets the cached key so the next call re-reads secure storage.
    pub fn invalidate(&self) {
        debug!(key_id = %self.key_id, "master key cache invalidated");
        *self.cached.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyStorage;

    struct BrokenStorage;

    impl SecureStorage for BrokenStorage {
        fn save_key(&self, _: &str, _: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("keychain locked".into()))
        }
        fn load_key(&self, _: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Err(StorageError::Unavailable("keychain locked".into()))
        }
        fn delete_key(&self, _: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_creates_key_once_and_reuses_it() {
        let storage = Arc::new(MemoryKeyStorage::new());
        let manager = KeyManager::new(storage.clone(), "bill_master_key");

        let first = manager.get_or_create_key().unwrap();
        let second = manager.get_or_create_key().unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());

        let stored = storage.load_key("bill_master_key").unwrap().unwrap();
        assert_eq!(stored.as_slice(), first.as_bytes());
    }

    #[test]
    fn test_reads_existing_key() {
        let storage = Arc::new(MemoryKeyStorage::new());
        storage.save_key("bill_master_key", &[9u8; 32]).unwrap();

        let manager = KeyManager::new(storage, "bill_master_key");
        assert_eq!(manager.get_or_create_key().unwrap().as_bytes(), &[9u8; 32]);
    }

    #[test]
    fn test_invalidate_picks_up_overwritten_key() {
        let storage = Arc::new(MemoryKeyStorage::new());
        let manager = KeyManager::new(storage.clone(), "bill_master_key");
        let original = manager.get_or_create_key().unwrap();

        storage.save_key("bill_master_key", &[1u8; 32]).unwrap();
        assert_eq!(
            manager.get_or_create_key().unwrap().as_bytes(),
            original.as_bytes()
        );

        manager.invalidate();
        assert_eq!(manager.get_or_create_key().unwrap().as_bytes(), &[1u8; 32]);
    }

    #[test]
    fn test_storage_failure_propagates() {
        let manager = KeyManager::new(Arc::new(BrokenStorage), "bill_master_key");
        assert!(matches!(
            manager.get_or_create_key(),
            Err(StorageError::Unavailable(_))
        ));
    }

    #[test]
    fn test_corrupt_stored_key_is_not_replaced() {
        let storage = Arc::new(MemoryKeyStorage::new());
        storage.save_key("bill_master_key", &[1, 2, 3]).unwrap();

        let manager = KeyManager::new(storage.clone(), "bill_master_key");
        assert!(matches!(
            manager.get_or_create_key(),
            Err(StorageError::Encryption(_))
        ));
        assert_eq!(
            storage.load_key("bill_master_key").unwrap(),
            Some(vec![1, 2, 3])
        );
    }
}
