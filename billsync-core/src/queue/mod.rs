// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Offline Mutation Queue
//!
//! Edits made while offline are queued here and replayed against the remote
//! service once connectivity returns.

mod mutation_queue;
mod processor;
mod remote;
mod types;

pub use mutation_queue::MutationQueue;
pub use remote::{
    ConnectivityProbe, RemoteBillService, RemoteError, RemoteErrorKind, GENERIC_FAILURE,
};
pub use types::{DeadLetter, Mutation, MutationQueueItem, MutationType, ProcessReport};

use thiserror::Error;

use crate::storage::StorageError;

/// Queue operation errors.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        QueueError::Serialization(e.to_string())
    }
}
