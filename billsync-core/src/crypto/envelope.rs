// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Field Envelope
//!
//! Per-field authenticated encryption for sensitive bill values. An encrypted
//! field is the string `hex(iv):hex(tag):hex(ciphertext)`; anything that does
//! not split into exactly three colon-separated parts is legacy plaintext.
//!
//! # Decrypt fallback policy
//!
//! Decryption never fails. When a value looks encrypted but cannot be opened
//! (wrong key, corrupted tag, malformed hex, key storage unavailable) the
//! original string is returned unchanged, so the user still sees their data.
//! This favors availability over confidentiality. Every fallback is logged at
//! `warn` and reported through [`Opened::Fallback`] for callers that need to
//! act on it.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use super::encryption::{self, EncryptionError, SymmetricKey};
use super::key_manager::KeyManager;
use crate::storage::StorageError;

/// Errors surfaced by [`FieldEnvelope::encrypt`].
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("master key unavailable: {0}")]
    KeyUnavailable(#[from] StorageError),

    #[error("cipher failure: {0}")]
    Cipher(#[from] EncryptionError),
}

/// Why a value that looked encrypted was returned as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    KeyUnavailable,
    MalformedHex,
    AuthenticationFailed,
    InvalidUtf8,
}

/// Result of opening a stored field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// Input was empty.
    Empty,
    /// Input was not in envelope shape; returned unchanged.
    Plaintext(String),
    /// Successfully decrypted.
    Decrypted(String),
    /// Input looked encrypted but could not be opened; returned unchanged.
    Fallback {
        value: String,
        reason: FallbackReason,
    },
}

impl Opened {
    /// The string to show the user.
    pub fn into_string(self) -> String {
        match self {
            Opened::Empty => String::new(),
            Opened::Plaintext(value) | Opened::Decrypted(value) => value,
            Opened::Fallback { value, .. } => value,
        }
    }
}

/// Returns true if `value` has the three-part envelope shape.
///
/// Shape only; the parts are not validated.
pub fn is_envelope_shaped(value: &str) -> bool {
    value.split(':').count() == 3
}

/// Encrypts `plaintext` with `key` into envelope form. Empty input stays empty.
pub fn seal_with_key(key: &SymmetricKey, plaintext: &str) -> Result<String, EncryptionError> {
    if plaintext.is_empty() {
        return Ok(String::new());
    }
    let parts = encryption::seal(key, plaintext.as_bytes())?;
    Ok(format!(
        "{}:{}:{}",
        hex::encode(parts.nonce),
        hex::encode(parts.tag),
        hex::encode(&parts.ciphertext)
    ))
}

/// Opens an envelope with `key`.
pub fn open_with_key(key: &SymmetricKey, value: &str) -> Opened {
    if value.is_empty() {
        return Opened::Empty;
    }

    let parts: Vec<&str> = value.split(':').collect();
    let [iv, tag, ciphertext] = parts.as_slice() else {
        return Opened::Plaintext(value.to_string());
    };

    let fallback = |reason| Opened::Fallback {
        value: value.to_string(),
        reason,
    };

    let decoded = (hex::decode(iv), hex::decode(tag), hex::decode(ciphertext));
    let (Ok(iv), Ok(tag), Ok(ciphertext)) = decoded else {
        return fallback(FallbackReason::MalformedHex);
    };

    match encryption::open(key, &iv, &tag, &ciphertext) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(plain) => Opened::Decrypted(plain),
            Err(_) => fallback(FallbackReason::InvalidUtf8),
        },
        Err(_) => fallback(FallbackReason::AuthenticationFailed),
    }
}

/// Field encryption bound to the device master key.
#[derive(Clone)]
pub struct FieldEnvelope {
    keys: Arc<KeyManager>,
}

impl FieldEnvelope {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    /// Encrypts a field value.
    ///
    /// Empty input returns an empty string without touching the key. Any key
    /// or cipher failure is returned; storing plaintext instead is the
    /// caller's explicit decision.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let key = self.keys.get_or_create_key()?;
        Ok(seal_with_key(&key, plaintext)?)
    }

    /// Decrypts a field value, falling back to the input unchanged.
    pub fn decrypt(&self, value: &str) -> String {
        self.open(value).into_string()
    }

    /// Decrypts a field value and reports which branch was taken.
    pub fn open(&self, value: &str) -> Opened {
        if value.is_empty() {
            return Opened::Empty;
        }
        if !is_envelope_shaped(value) {
            return Opened::Plaintext(value.to_string());
        }

        let opened = match self.keys.get_or_create_key() {
            Ok(key) => open_with_key(&key, value),
            Err(e) => {
                warn!(error = %e, "master key unavailable while decrypting field");
                Opened::Fallback {
                    value: value.to_string(),
                    reason: FallbackReason::KeyUnavailable,
                }
            }
        };

        if let Opened::Fallback { reason, .. } = &opened {
            warn!(?reason, "field decryption failed, returning stored value unchanged");
        }
        opened
    }
}
