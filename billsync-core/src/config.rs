// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration for the consistency layer.

use std::path::PathBuf;
use std::time::Duration;

/// Action id for the "Mark Paid" notification button.
pub const ACTION_MARK_PAID: &str = "mark_paid";
/// Action id for the "Snooze 1 hour" notification button.
pub const ACTION_SNOOZE: &str = "snooze";

/// Storage keys, limits and notification identifiers.
#[derive(Debug, Clone)]
pub struct BillSyncConfig {
    /// SQLite database path; `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,

    /// Secure-storage name of the device master key.
    pub master_key_id: String,

    /// Key-value key holding the mutation queue (JSON array).
    pub queue_key: String,

    /// Key-value key holding permanently failed mutations (JSON array).
    pub dead_letter_key: String,

    /// Key-value key holding the bill-to-notification map (JSON object).
    pub notification_map_key: String,

    /// Maximum number of queued mutations.
    pub max_queue_size: usize,

    /// How long the "Snooze" action suppresses a bill's reminder.
    pub snooze_duration: Duration,

    /// Notification category for overdue bills (carries the action buttons).
    pub overdue_category: String,

    /// Notification category for upcoming bills.
    pub upcoming_category: String,
}

impl Default for BillSyncConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            master_key_id: "bill_master_key".to_string(),
            queue_key: "mutation_queue".to_string(),
            dead_letter_key: "mutation_dead_letters".to_string(),
            notification_map_key: "bill_notification_map".to_string(),
            max_queue_size: 1000,
            snooze_duration: Duration::from_secs(3600), // 1 hour
            overdue_category: "bill-overdue".to_string(),
            upcoming_category: "bill-upcoming".to_string(),
        }
    }
}

impl BillSyncConfig {
    /// Persist to a SQLite database at `path`.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Override the queue size limit.
    pub fn with_max_queue_size(mut self, max: usize) -> Self {
        self.max_queue_size = max;
        self
    }

    /// Override the snooze duration.
    pub fn with_snooze_duration(mut self, duration: Duration) -> Self {
        self.snooze_duration = duration;
        self
    }

    /// Prefix every storage key, for running several accounts side by side.
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        for key in [
            &mut self.master_key_id,
            &mut self.queue_key,
            &mut self.dead_letter_key,
            &mut self.notification_map_key,
        ] {
            *key = format!("{prefix}{key}");
        }
        self
    }
}
