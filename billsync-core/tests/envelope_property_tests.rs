//! Field Envelope Property Tests
//!
//! Round-trip and fallback laws of the field envelope, checked over generated
//! inputs, plus key persistence across restarts.

use std::sync::Arc;

use billsync_core::crypto::envelope::{is_envelope_shaped, open_with_key, seal_with_key};
use billsync_core::{
    FallbackReason, FieldEnvelope, FileKeyStorage, KeyManager, MemoryKeyStorage, Opened,
    SecureStorage, SymmetricKey,
};
use proptest::prelude::*;
use quickcheck_macros::quickcheck;

fn envelope() -> FieldEnvelope {
    let storage: Arc<dyn SecureStorage> = Arc::new(MemoryKeyStorage::new());
    FieldEnvelope::new(Arc::new(KeyManager::new(storage, "bill_master_key")))
}

fn bytes32_strategy() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

fn is_lower_hex(s: &str) -> bool {
    s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

// ============================================================
// Round trip
// ============================================================

proptest! {
    /// Property: decrypt(encrypt(s)) == s for any string under one key
    #[test]
    fn prop_encrypt_decrypt_roundtrip(plain in ".{0,200}") {
        let env = envelope();
        let sealed = env.encrypt(&plain).unwrap();
        prop_assert_eq!(env.decrypt(&sealed), plain);
    }

    /// Property: sealing with a raw key and opening with it agree
    #[test]
    fn prop_raw_key_roundtrip(key_bytes in bytes32_strategy(), plain in ".{1,100}") {
        let key = SymmetricKey::from_bytes(key_bytes);
        let sealed = seal_with_key(&key, &plain).unwrap();
        prop_assert_eq!(open_with_key(&key, &sealed), Opened::Decrypted(plain));
    }

    /// Property: text without exactly two colons is returned as-is
    #[test]
    fn prop_non_triplet_is_plaintext(plain in "[^:]{1,80}(:[^:]{0,20})?") {
        let env = envelope();
        prop_assert_eq!(env.decrypt(&plain), plain);
    }

    /// Property: a foreign key never yields anything but the original input
    #[test]
    fn prop_wrong_key_falls_back_to_input(
        a in bytes32_strategy(),
        b in bytes32_strategy(),
        plain in ".{1,60}",
    ) {
        prop_assume!(a != b);
        let sealed = seal_with_key(&SymmetricKey::from_bytes(a), &plain).unwrap();
        let opened = open_with_key(&SymmetricKey::from_bytes(b), &sealed);
        prop_assert_eq!(
            opened,
            Opened::Fallback {
                value: sealed.clone(),
                reason: FallbackReason::AuthenticationFailed,
            }
        );
    }
}

/// Sealed values are three lowercase hex parts: 12-byte iv, 16-byte tag and
/// the ciphertext.
#[quickcheck]
fn qc_sealed_shape(plain: String) -> bool {
    let sealed = envelope().encrypt(&plain).unwrap();
    if plain.is_empty() {
        return sealed.is_empty();
    }
    let parts: Vec<&str> = sealed.split(':').collect();
    is_envelope_shaped(&sealed)
        && parts.len() == 3
        && parts[0].len() == 24
        && parts[1].len() == 32
        && parts[2].len() == plain.len() * 2
        && parts.iter().all(|p| is_lower_hex(p))
}

// ============================================================
// Key persistence
// ============================================================

#[test]
fn test_key_survives_restart_with_file_storage() {
    let dir = tempfile::tempdir().unwrap();

    let sealed = {
        let storage: Arc<dyn SecureStorage> = Arc::new(FileKeyStorage::new(dir.path().into()));
        let env = FieldEnvelope::new(Arc::new(KeyManager::new(storage, "bill_master_key")));
        env.encrypt("Acme Power").unwrap()
    };

    let storage: Arc<dyn SecureStorage> = Arc::new(FileKeyStorage::new(dir.path().into()));
    let env = FieldEnvelope::new(Arc::new(KeyManager::new(storage, "bill_master_key")));
    assert_eq!(env.open(&sealed), Opened::Decrypted("Acme Power".into()));
}

#[test]
fn test_concurrent_first_use_creates_one_key() {
    let storage = Arc::new(MemoryKeyStorage::new());
    let keys = Arc::new(KeyManager::new(
        storage.clone() as Arc<dyn SecureStorage>,
        "bill_master_key",
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let env = FieldEnvelope::new(keys.clone());
            std::thread::spawn(move || env.encrypt(&format!("creditor {}", i)).unwrap())
        })
        .collect();
    let sealed: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Every value opens under the one stored key
    let stored = storage.load_key("bill_master_key").unwrap().unwrap();
    let key = SymmetricKey::from_slice(&stored).unwrap();
    for (i, value) in sealed.iter().enumerate() {
        assert_eq!(
            open_with_key(&key, value),
            Opened::Decrypted(format!("creditor {}", i))
        );
    }
}
