// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persisted mutation queue.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::remote::{ConnectivityProbe, RemoteBillService};
use super::QueueError;
use super::types::{DeadLetter, Mutation, MutationQueueItem};
use crate::clock::Clock;
use crate::config::BillSyncConfig;
use crate::storage::kv::{load_json, save_json};
use crate::storage::{KeyValueStore, StorageError};

/// Ordered, persisted list of writes waiting for the remote service.
///
/// Items are processed in FIFO order. Every read-modify-write of the queue or
/// the dead-letter list happens under one async lock, so an `enqueue` racing
/// a `process` pass cannot drop or duplicate items.
pub struct MutationQueue {
    pub(super) store: Arc<dyn KeyValueStore>,
    pub(super) remote: Arc<dyn RemoteBillService>,
    pub(super) connectivity: Arc<dyn ConnectivityProbe>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) queue_key: String,
    pub(super) dead_letter_key: String,
    max_queue_size: usize,
    pub(super) lock: Mutex<()>,
}

impl MutationQueue {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteBillService>,
        connectivity: Arc<dyn ConnectivityProbe>,
        clock: Arc<dyn Clock>,
        config: &BillSyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            connectivity,
            clock,
            queue_key: config.queue_key.clone(),
            dead_letter_key: config.dead_letter_key.clone(),
            max_queue_size: config.max_queue_size,
            lock: Mutex::new(()),
        }
    }

    pub(super) fn load_items(&self) -> Result<Vec<MutationQueueItem>, StorageError> {
        load_json(self.store.as_ref(), &self.queue_key)
    }

    pub(super) fn save_items(&self, items: &[MutationQueueItem]) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), &self.queue_key, &items)
    }

    pub(super) fn load_dead_letters(&self) -> Result<Vec<DeadLetter>, StorageError> {
        load_json(self.store.as_ref(), &self.dead_letter_key)
    }

    pub(super) fn save_dead_letters(&self, letters: &[DeadLetter]) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), &self.dead_letter_key, &letters)
    }

    /// Appends a mutation without trying to flush. Returns the new item id.
    pub async fn push(&self, mutation: Mutation) -> Result<String, QueueError> {
        let _guard = self.lock.lock().await;

        let mut items = self.load_items()?;
        if items.len() >= self.max_queue_size {
            warn!(pending = items.len(), "mutation queue full");
            return Err(StorageError::QueueFull(items.len()).into());
        }

        let item = MutationQueueItem {
            id: uuid::Uuid::new_v4().to_string(),
            mutation,
            timestamp: self.clock.now(),
        };
        let id = item.id.clone();
        debug!(item_id = %id, kind = ?item.mutation.mutation_type(), "mutation queued");

        items.push(item);
        self.save_items(&items)?;
        Ok(id)
    }

    /// Appends a mutation, then makes one opportunistic flush attempt.
    ///
    /// A failed flush is logged and leaves the item queued for a later
    /// trigger; only the append itself can fail this call.
    pub async fn enqueue(&self, mutation: Mutation) -> Result<String, QueueError> {
        let id = self.push(mutation).await?;
        if let Err(e) = self.process().await {
            warn!(error = %e, "opportunistic queue flush failed");
        }
        Ok(id)
    }

    /// Number of queued mutations. Read-only.
    pub fn pending_count(&self) -> Result<usize, QueueError> {
        Ok(self.load_items()?.len())
    }

    /// Snapshot of the queue in processing order.
    pub fn pending(&self) -> Result<Vec<MutationQueueItem>, QueueError> {
        Ok(self.load_items()?)
    }

    /// Mutations the server rejected permanently, oldest first.
    pub fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError> {
        Ok(self.load_dead_letters()?)
    }

    /// Moves a dead-lettered mutation back to the tail of the queue.
    ///
    /// Returns false if no dead letter has that id.
    pub async fn retry_dead_letter(&self, item_id: &str) -> Result<bool, QueueError> {
        let _guard = self.lock.lock().await;

        let mut letters = self.load_dead_letters()?;
        let Some(pos) = letters.iter().position(|l| l.item.id == item_id) else {
            return Ok(false);
        };

        let mut items = self.load_items()?;
        if items.len() >= self.max_queue_size {
            return Err(StorageError::QueueFull(items.len()).into());
        }

        let letter = letters.remove(pos);
        if !items.iter().any(|i| i.id == letter.item.id) {
            items.push(letter.item);
        }
        // Queue first: a crash in between leaves a duplicate, never a loss.
        self.save_items(&items)?;
        self.save_dead_letters(&letters)?;

        info!(item_id, "dead-lettered mutation requeued");
        Ok(true)
    }

    /// Drops a dead-lettered mutation for good.
    pub async fn discard_dead_letter(&self, item_id: &str) -> Result<bool, QueueError> {
        let _guard = self.lock.lock().await;

        let mut letters = self.load_dead_letters()?;
        let before = letters.len();
        letters.retain(|l| l.item.id != item_id);
        if letters.len() == before {
            return Ok(false);
        }
        self.save_dead_letters(&letters)?;
        info!(item_id, "dead-lettered mutation discarded");
        Ok(true)
    }
}
