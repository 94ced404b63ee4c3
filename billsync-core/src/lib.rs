// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! BillSync Core Library
//!
//! Local-first consistency layer for a bill tracker: field encryption under a
//! device master key, an offline mutation queue replayed against the remote
//! service, and local reminders rebuilt from the authoritative bill list.
//! All cryptographic operations use the audited `ring` crate.

pub mod api;
pub mod bill;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod notifications;
pub mod queue;
pub mod storage;

pub use api::{BillSync, BillSyncBuilder, BillSyncError, BillSyncResult, RefreshOutcome};
pub use bill::{Bill, BillDraft, BillPatch, BillStatus, PaymentMethod, Recurrence};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BillSyncConfig, ACTION_MARK_PAID, ACTION_SNOOZE};
pub use crypto::{CryptoError, FallbackReason, FieldEnvelope, KeyManager, Opened, SymmetricKey};
pub use notifications::{
    NotificationMapStore, NotificationRequest, NotificationScheduler, Notifier, NotifyError,
    ReminderError, ReminderSyncOrchestrator, ResyncReport, ScheduleOutcome, Trigger,
};
pub use queue::{
    ConnectivityProbe, DeadLetter, Mutation, MutationQueue, MutationQueueItem, MutationType,
    ProcessReport, QueueError, RemoteBillService, RemoteError, RemoteErrorKind,
};
pub use storage::{
    FileKeyStorage, KeyValueStore, MemoryKeyStorage, MemoryStore, SecureStorage, Storage,
    StorageError,
};
