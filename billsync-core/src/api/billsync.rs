// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! BillSync Service Container
//!
//! Built once at process start and shared by every screen and background
//! trigger. Owns the only instances of the key manager, mutation queue and
//! notification scheduler, so their locks actually serialize access.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bill::{Bill, BillDraft, BillPatch};
use crate::clock::{Clock, SystemClock};
use crate::config::{BillSyncConfig, ACTION_MARK_PAID, ACTION_SNOOZE};
use crate::crypto::{FieldEnvelope, KeyManager};
use crate::notifications::{
    NotificationMapStore, NotificationScheduler, Notifier, ReminderError,
    ReminderSyncOrchestrator, ResyncReport,
};
use crate::queue::{
    ConnectivityProbe, DeadLetter, Mutation, MutationQueue, ProcessReport, RemoteBillService,
};
use crate::storage::{KeyValueStore, SecureStorage, Storage};

use super::error::{BillSyncError, BillSyncResult};

/// Result of a [`BillSync::refresh`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// No connectivity; nothing was fetched or rescheduled.
    Offline,
    /// The bill list was fetched and reminders rebuilt from it.
    Refreshed {
        /// Bills with sealed fields opened.
        bills: Vec<Bill>,
        /// Flush of the mutation queue that ran before the fetch.
        queue: ProcessReport,
        /// `None` when notification permission is not granted.
        reminders: Option<ResyncReport>,
    },
}

/// Main BillSync orchestrator.
///
/// # Example
///
/// ```ignore
/// let sync = BillSync::builder()
///     .remote(remote)
///     .connectivity(probe)
///     .notifier(notifier)
///     .build()?;
///
/// sync.create_bill(&draft).await?;
/// sync.handle_action("snooze", &bill_id).await?;
/// ```
pub struct BillSync {
    config: BillSyncConfig,
    envelope: FieldEnvelope,
    queue: MutationQueue,
    scheduler: Arc<NotificationScheduler>,
    reminders: ReminderSyncOrchestrator,
    remote: Arc<dyn RemoteBillService>,
    connectivity: Arc<dyn ConnectivityProbe>,
    clock: Arc<dyn Clock>,
}

impl BillSync {
    /// Returns a builder with default configuration.
    pub fn builder() -> BillSyncBuilder {
        BillSyncBuilder::new()
    }

    pub fn config(&self) -> &BillSyncConfig {
        &self.config
    }

    /// Field envelope for the remote-service adapter.
    pub fn envelope(&self) -> &FieldEnvelope {
        &self.envelope
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    // === Mutations ===

    /// Queues a bill creation. The creditor is sealed before it is persisted.
    pub async fn create_bill(&self, draft: &BillDraft) -> BillSyncResult<String> {
        let bill = draft.sealed(&self.envelope)?;
        self.enqueue(Mutation::Create { bill }).await
    }

    /// Queues a partial update. A creditor in the patch is sealed first.
    pub async fn update_bill(&self, bill_id: &str, patch: &BillPatch) -> BillSyncResult<String> {
        let patch = patch.sealed(&self.envelope)?;
        self.enqueue(Mutation::Update {
            bill_id: bill_id.to_string(),
            patch,
        })
        .await
    }

    /// Queues a deletion and drops the bill's reminder.
    pub async fn delete_bill(&self, bill_id: &str) -> BillSyncResult<String> {
        self.cancel_reminder_quietly(bill_id).await;
        self.enqueue(Mutation::Delete {
            bill_id: bill_id.to_string(),
        })
        .await
    }

    /// Queues a mark-paid and drops the bill's reminder.
    pub async fn mark_paid(&self, bill_id: &str) -> BillSyncResult<String> {
        if let Some(notification_id) = self.cancel_reminder_quietly(bill_id).await {
            if let Err(e) = self.scheduler.dismiss(&notification_id).await {
                warn!(bill_id, error = %e, "could not dismiss delivered reminder");
            }
        }
        self.enqueue(Mutation::MarkPaid {
            bill_id: bill_id.to_string(),
        })
        .await
    }

    /// Snoozes a bill for the configured duration.
    pub async fn snooze(&self, bill_id: &str) -> BillSyncResult<String> {
        let duration = chrono::Duration::from_std(self.config.snooze_duration)
            .map_err(|e| BillSyncError::Configuration(format!("snooze duration: {}", e)))?;
        let until = self.clock.now() + duration;

        self.cancel_reminder_quietly(bill_id).await;
        self.enqueue(Mutation::Update {
            bill_id: bill_id.to_string(),
            patch: BillPatch::snooze(until),
        })
        .await
    }

    /// Persists a mutation, then flushes the queue if online.
    ///
    /// Sensitive fields must already be sealed; prefer the typed helpers
    /// above. Only the append can fail this call.
    pub async fn enqueue(&self, mutation: Mutation) -> BillSyncResult<String> {
        let id = self.queue.push(mutation).await?;
        if let Err(e) = self.process_queue().await {
            warn!(error = %e, "queue flush after enqueue failed");
        }
        Ok(id)
    }

    /// Flushes the queue and surfaces any newly dead-lettered mutation.
    pub async fn process_queue(&self) -> BillSyncResult<ProcessReport> {
        let report = self.queue.process().await?;
        for letter in &report.dead_lettered {
            self.surface_dead_letter(letter).await;
        }
        Ok(report)
    }

    pub fn pending_count(&self) -> BillSyncResult<usize> {
        Ok(self.queue.pending_count()?)
    }

    pub fn dead_letters(&self) -> BillSyncResult<Vec<DeadLetter>> {
        Ok(self.queue.dead_letters()?)
    }

    /// Requeues a dead-lettered mutation and flushes.
    pub async fn retry_dead_letter(&self, item_id: &str) -> BillSyncResult<bool> {
        if !self.queue.retry_dead_letter(item_id).await? {
            return Ok(false);
        }
        if let Err(e) = self.process_queue().await {
            warn!(error = %e, "queue flush after retry failed");
        }
        Ok(true)
    }

    pub async fn discard_dead_letter(&self, item_id: &str) -> BillSyncResult<bool> {
        Ok(self.queue.discard_dead_letter(item_id).await?)
    }

    // === Reminders ===

    /// Registers notification categories. Call once at startup.
    pub async fn register_categories(&self) -> BillSyncResult<()> {
        Ok(self.scheduler.register_categories().await?)
    }

    /// Rebuilds reminders from a bill list already in hand.
    pub async fn resync(&self, bills: &[Bill]) -> BillSyncResult<ResyncReport> {
        Ok(self.reminders.resync_from_bills(bills).await?)
    }

    /// Flushes pending writes, fetches the bill list and rebuilds reminders.
    ///
    /// Missing notification permission is not an error here: the bills are
    /// still returned with `reminders: None`.
    pub async fn refresh(&self) -> BillSyncResult<RefreshOutcome> {
        if !self.connectivity.is_connected().await {
            debug!("offline, refresh skipped");
            return Ok(RefreshOutcome::Offline);
        }

        let queue = self.process_queue().await?;

        let bills: Vec<Bill> = self
            .remote
            .list()
            .await?
            .iter()
            .map(|b| b.opened(&self.envelope))
            .collect();

        let reminders = match self.reminders.resync_from_bills(&bills).await {
            Ok(report) => Some(report),
            Err(ReminderError::PermissionDenied) => None,
            Err(e) => return Err(e.into()),
        };

        info!(bills = bills.len(), "bill list refreshed");
        Ok(RefreshOutcome::Refreshed {
            bills,
            queue,
            reminders,
        })
    }

    /// Handles a tap on a notification action button.
    pub async fn handle_action(&self, action_id: &str, bill_id: &str) -> BillSyncResult<String> {
        debug!(action_id, bill_id, "notification action");
        match action_id {
            ACTION_MARK_PAID => self.mark_paid(bill_id).await,
            ACTION_SNOOZE => self.snooze(bill_id).await,
            other => Err(BillSyncError::UnknownAction(other.to_string())),
        }
    }

    async fn cancel_reminder_quietly(&self, bill_id: &str) -> Option<String> {
        match self.scheduler.cancel_bill_reminder(bill_id).await {
            Ok(id) => id,
            Err(e) => {
                warn!(bill_id, error = %e, "reminder cancel failed");
                None
            }
        }
    }

    async fn surface_dead_letter(&self, letter: &DeadLetter) {
        let body = match letter.item.mutation.bill_id() {
            Some(bill_id) => format!(
                "A {:?} change for bill {} was rejected: {}",
                letter.item.mutation.mutation_type(),
                bill_id,
                letter.error
            ),
            None => format!("A new bill could not be saved: {}", letter.error),
        };
        if let Err(e) = self.scheduler.notify_now("Change not saved", &body).await {
            warn!(item_id = %letter.item.id, error = %e, "could not surface dead letter");
        }
    }
}

/// Builder for creating BillSync instances.
///
/// # Master key storage
///
/// With the `secure-storage` feature the master key defaults to the OS
/// keychain. Without it the default is [`FileKeyStorage`](crate::FileKeyStorage):
/// the raw key is written to `keys/` next to the database, guarded only by
/// the owner-only (0600) file mode and the app sandbox. Anyone who can read
/// the app's data directory can decrypt every bill. Production builds should
/// enable `secure-storage` or pass a keychain-backed store through
/// [`secure_storage`](Self::secure_storage).
pub struct BillSyncBuilder {
    config: BillSyncConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    secure_storage: Option<Arc<dyn SecureStorage>>,
    remote: Option<Arc<dyn RemoteBillService>>,
    connectivity: Option<Arc<dyn ConnectivityProbe>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
}

impl BillSyncBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        BillSyncBuilder {
            config: BillSyncConfig::default(),
            store: None,
            secure_storage: None,
            remote: None,
            connectivity: None,
            notifier: None,
            clock: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: BillSyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the SQLite database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    /// Uses an existing key-value store instead of opening SQLite.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets where the master key lives.
    ///
    /// Overrides the default described on [`BillSyncBuilder`].
    pub fn secure_storage(mut self, storage: Arc<dyn SecureStorage>) -> Self {
        self.secure_storage = Some(storage);
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteBillService>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn connectivity(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.connectivity = Some(probe);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the BillSync instance.
    ///
    /// The remote service, connectivity probe and notifier are required.
    pub fn build(self) -> BillSyncResult<BillSync> {
        let remote = self
            .remote
            .ok_or_else(|| BillSyncError::Configuration("remote service not set".into()))?;
        let connectivity = self
            .connectivity
            .ok_or_else(|| BillSyncError::Configuration("connectivity probe not set".into()))?;
        let notifier = self
            .notifier
            .ok_or_else(|| BillSyncError::Configuration("notifier not set".into()))?;
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let store: Arc<dyn KeyValueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(open_storage(&self.config)?),
        };
        let secure_storage = self
            .secure_storage
            .unwrap_or_else(|| default_secure_storage(&self.config));

        let keys = Arc::new(KeyManager::new(
            secure_storage,
            self.config.master_key_id.clone(),
        ));
        let envelope = FieldEnvelope::new(keys);

        let map = NotificationMapStore::new(store.clone(), self.config.notification_map_key.clone());
        let scheduler = Arc::new(NotificationScheduler::new(
            notifier,
            map,
            clock.clone(),
            &self.config,
        ));
        let reminders = ReminderSyncOrchestrator::new(scheduler.clone());

        let queue = MutationQueue::new(
            store,
            remote.clone(),
            connectivity.clone(),
            clock.clone(),
            &self.config,
        );

        Ok(BillSync {
            config: self.config,
            envelope,
            queue,
            scheduler,
            reminders,
            remote,
            connectivity,
            clock,
        })
    }
}

impl Default for BillSyncBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn open_storage(config: &BillSyncConfig) -> BillSyncResult<Storage> {
    let Some(path) = &config.database_path else {
        return Ok(Storage::in_memory()?);
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BillSyncError::Configuration(e.to_string()))?;
    }
    Ok(Storage::open(path)?)
}

#[cfg(feature = "secure-storage")]
fn default_secure_storage(_config: &BillSyncConfig) -> Arc<dyn SecureStorage> {
    Arc::new(crate::storage::PlatformKeyring::new("billsync"))
}

/// Keys sit next to the database when there is one; otherwise they live only
/// as long as the process, matching the in-memory store.
///
/// The file variant holds the raw master key, so this is the weaker default.
#[cfg(not(feature = "secure-storage"))]
fn default_secure_storage(config: &BillSyncConfig) -> Arc<dyn SecureStorage> {
    match config.database_path.as_ref().and_then(|p| p.parent()) {
        Some(dir) => Arc::new(crate::storage::FileKeyStorage::new(dir.join("keys"))),
        None => Arc::new(crate::storage::MemoryKeyStorage::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryKeyStorage, MemoryStore};

    #[test]
    fn test_build_requires_collaborators() {
        let result = BillSync::builder()
            .store(Arc::new(MemoryStore::new()))
            .secure_storage(Arc::new(MemoryKeyStorage::new()))
            .build();
        assert!(matches!(result, Err(BillSyncError::Configuration(_))));
    }
}
