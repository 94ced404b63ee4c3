// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Full reminder rebuild from the authoritative bill list.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use super::{NotificationScheduler, ReminderError, ScheduleOutcome};
use crate::bill::Bill;

/// Outcome of a resync pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResyncReport {
    /// Bill ids whose mapping was dropped because the bill left the list.
    pub cancelled_orphans: Vec<String>,
    /// Bills that ended with a live notification.
    pub scheduled: usize,
    /// Bills that ended without one.
    pub skipped: usize,
    /// `(bill_id, error)` for bills that could not be processed.
    pub failed: Vec<(String, String)>,
}

/// Makes notification state a function of the current bill list.
///
/// Every bill is rescheduled on each pass rather than diffing against the
/// previous list. Bill counts per user are small, and the scheduler's
/// cancel-first step already makes each reschedule idempotent.
pub struct ReminderSyncOrchestrator {
    scheduler: Arc<NotificationScheduler>,
}

impl ReminderSyncOrchestrator {
    pub fn new(scheduler: Arc<NotificationScheduler>) -> Self {
        Self { scheduler }
    }

    /// Cancels reminders for bills no longer present and reschedules all others.
    ///
    /// Returns [`ReminderError::PermissionDenied`] without touching anything if
    /// notifications are not authorized. A failure on one bill is recorded in
    /// the report and the pass continues.
    pub async fn resync_from_bills(&self, bills: &[Bill]) -> Result<ResyncReport, ReminderError> {
        if !self.scheduler.permission_granted().await? {
            info!("notification permission not granted, skipping reminder resync");
            return Err(ReminderError::PermissionDenied);
        }

        let session = self.scheduler.session().await;
        let mut report = ResyncReport::default();
        let current: HashSet<&str> = bills.iter().map(|b| b.id.as_str()).collect();

        for (bill_id, _) in session.mappings()? {
            if current.contains(bill_id.as_str()) {
                continue;
            }
            match session.cancel(&bill_id).await {
                Ok(_) => report.cancelled_orphans.push(bill_id),
                Err(e) => {
                    warn!(bill_id = %bill_id, error = %e, "failed to cancel orphaned reminder");
                    report.failed.push((bill_id, e.to_string()));
                }
            }
        }

        for bill in bills {
            match session.schedule(bill).await {
                Ok(ScheduleOutcome::Scheduled { .. }) => report.scheduled += 1,
                Ok(ScheduleOutcome::Skipped(_)) => report.skipped += 1,
                Err(e) => {
                    warn!(bill_id = %bill.id, error = %e, "failed to schedule reminder");
                    report.failed.push((bill.id.clone(), e.to_string()));
                }
            }
        }

        info!(
            bills = bills.len(),
            scheduled = report.scheduled,
            skipped = report.skipped,
            orphans = report.cancelled_orphans.len(),
            failed = report.failed.len(),
            "reminder resync complete"
        );
        Ok(report)
    }
}
