// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Error Types
//!
//! Unified error type for the BillSync service container.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::notifications::ReminderError;
use crate::queue::{QueueError, RemoteError};
use crate::storage::StorageError;

/// Unified error type for BillSync operations.
#[derive(Error, Debug)]
pub enum BillSyncError {
    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Field encryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Mutation queue operation failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Reminder scheduling failed.
    #[error("reminder error: {0}")]
    Reminder(#[from] ReminderError),

    /// Remote service call failed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Notification action id not recognised.
    #[error("unknown notification action: {0}")]
    UnknownAction(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for BillSync operations.
pub type BillSyncResult<T> = Result<T, BillSyncError>;
