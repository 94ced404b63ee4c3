// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod encryption;
pub mod envelope;
pub mod key_manager;

pub use encryption::{EncryptionError, SymmetricKey};
pub use envelope::{CryptoError, FallbackReason, FieldEnvelope, Opened};
pub use key_manager::KeyManager;
