// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Symmetric Encryption (AES-256-GCM)
//!
//! Authenticated encryption that keeps nonce, tag and ciphertext as separate
//! parts, which is what the field envelope serializes.

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;
use zeroize::Zeroize;

/// Encryption error types.
#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed: data may be corrupted or wrong key")]
    DecryptionFailed,
    #[error("Invalid nonce length: expected 12 bytes, got {0}")]
    InvalidNonce(usize),
    #[error("Invalid tag length: expected 16 bytes, got {0}")]
    InvalidTag(usize),
    #[error("Random number generator failure")]
    Rng,
}

/// Nonce size for AES-256-GCM (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;
/// Authentication tag size.
pub const TAG_SIZE: usize = 16;
/// Key size (256 bits).
pub const KEY_SIZE: usize = 32;

/// 256-bit symmetric encryption key.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key bytes in debug output
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl SymmetricKey {
    /// Generates a new random symmetric key from the system CSPRNG.
    pub fn generate() -> Result<Self, EncryptionError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; KEY_SIZE];
        rng.fill(&mut bytes).map_err(|_| EncryptionError::Rng)?;
        Ok(SymmetricKey { bytes })
    }

    /// Creates a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        SymmetricKey { bytes }
    }

    /// Creates a key from a slice, which must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().ok()?;
        Some(SymmetricKey { bytes })
    }

    /// Returns a reference to the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    fn aead_key(&self) -> Result<LessSafeKey, EncryptionError> {
        let unbound =
            UnboundKey::new(&AES_256_GCM, &self.bytes).map_err(|_| EncryptionError::EncryptionFailed)?;
        Ok(LessSafeKey::new(unbound))
    }
}

/// Output of [`seal`]: the three parts of an AES-256-GCM encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedParts {
    pub nonce: [u8; NONCE_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Encrypts `plaintext` under a fresh random 12-byte nonce.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<SealedParts, EncryptionError> {
    let rng = SystemRandom::new();

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rng.fill(&mut nonce_bytes).map_err(|_| EncryptionError::Rng)?;

    let sealing_key = key.aead_key()?;
    let mut in_out = plaintext.to_vec();
    let tag = sealing_key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let tag: [u8; TAG_SIZE] = tag
        .as_ref()
        .try_into()
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    Ok(SealedParts {
        nonce: nonce_bytes,
        tag,
        ciphertext: in_out,
    })
}

/// Decrypts and authenticates the given parts.
pub fn open(
    key: &SymmetricKey,
    nonce: &[u8],
    tag: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if tag.len() != TAG_SIZE {
        return Err(EncryptionError::InvalidTag(tag.len()));
    }
    let nonce =
        Nonce::try_assume_unique_for_key(nonce).map_err(|_| EncryptionError::InvalidNonce(nonce.len()))?;

    let opening_key = key.aead_key().map_err(|_| EncryptionError::DecryptionFailed)?;

    let mut buffer = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    buffer.extend_from_slice(ciphertext);
    buffer.extend_from_slice(tag);

    let plaintext = opening_key
        .open_in_place(nonce, Aad::empty(), &mut buffer)
        .map_err(|_| EncryptionError::DecryptionFailed)?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = SymmetricKey::generate().unwrap();
        let parts = seal(&key, b"Electric company").unwrap();

        assert_eq!(parts.ciphertext.len(), "Electric company".len());
        let plain = open(&key, &parts.nonce, &parts.tag, &parts.ciphertext).unwrap();
        assert_eq!(plain, b"Electric company");
    }

    #[test]
    fn test_nonces_are_fresh() {
        let key = SymmetricKey::generate().unwrap();
        let a = seal(&key, b"same").unwrap();
        let b = seal(&key, b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = SymmetricKey::generate().unwrap();
        let other = SymmetricKey::generate().unwrap();
        let parts = seal(&key, b"secret").unwrap();

        let result = open(&other, &parts.nonce, &parts.tag, &parts.ciphertext);
        assert!(matches!(result, Err(EncryptionError::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = SymmetricKey::generate().unwrap();
        let mut parts = seal(&key, b"secret").unwrap();
        parts.tag[0] ^= 0xFF;

        assert!(open(&key, &parts.nonce, &parts.tag, &parts.ciphertext).is_err());
    }

    #[test]
    fn test_bad_part_lengths_rejected() {
        let key = SymmetricKey::generate().unwrap();
        let parts = seal(&key, b"secret").unwrap();

        assert!(matches!(
            open(&key, &parts.nonce[..8], &parts.tag, &parts.ciphertext),
            Err(EncryptionError::InvalidNonce(8))
        ));
        assert!(matches!(
            open(&key, &parts.nonce, &parts.tag[..4], &parts.ciphertext),
            Err(EncryptionError::InvalidTag(4))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = SymmetricKey::from_bytes([7u8; KEY_SIZE]);
        let rendered = format!("{:?}", key);
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains('7'));
    }

    #[test]
    fn test_from_slice_requires_32_bytes() {
        assert!(SymmetricKey::from_slice(&[0u8; 31]).is_none());
        assert!(SymmetricKey::from_slice(&[0u8; 32]).is_some());
    }
}
