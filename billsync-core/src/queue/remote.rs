// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Remote bill service and connectivity collaborators.

use async_trait::async_trait;
use thiserror::Error;

use crate::bill::{Bill, BillDraft, BillPatch};

/// Message used when the server gives no reason.
pub const GENERIC_FAILURE: &str = "request failed";

/// How a remote failure should be handled by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Connectivity or server-side trouble; retry later.
    Transient,
    /// The request itself was rejected; retrying will not help.
    Permanent,
    /// Credentials expired or missing; retry once the user signs in again.
    Unauthorized,
}

/// Error returned by the remote bill service adapter.
///
/// The adapter classifies every failure when it builds the error; the queue
/// only looks at [`RemoteError::kind`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The request never got a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transient, message)
    }

    /// A non-success HTTP response, with the server's message if it sent one.
    pub fn from_status(status: u16, server_message: Option<String>) -> Self {
        let kind = match status {
            401 | 403 => RemoteErrorKind::Unauthorized,
            408 | 425 | 429 => RemoteErrorKind::Transient,
            400..=499 => RemoteErrorKind::Permanent,
            _ => RemoteErrorKind::Transient,
        };
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        Self::new(kind, message)
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == RemoteErrorKind::Permanent
    }
}

/// The remote bill service.
///
/// Mutations carry a client-generated idempotency key (the queue item id) so
/// the server can drop resubmissions after a crash.
#[async_trait]
pub trait RemoteBillService: Send + Sync {
    async fn create(&self, draft: &BillDraft, idempotency_key: &str) -> Result<(), RemoteError>;

    async fn update(
        &self,
        bill_id: &str,
        patch: &BillPatch,
        idempotency_key: &str,
    ) -> Result<(), RemoteError>;

    async fn delete(&self, bill_id: &str, idempotency_key: &str) -> Result<(), RemoteError>;

    async fn mark_paid(&self, bill_id: &str, idempotency_key: &str) -> Result<(), RemoteError>;

    async fn list(&self) -> Result<Vec<Bill>, RemoteError>;
}

/// Reports whether the device currently has a network connection.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_connected(&self) -> bool;
}
