// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-bill reminder scheduling.
//!
//! Every call starts by cancelling the bill's existing notification, then
//! decides from scratch whether a new one is needed. That keeps at most one
//! live notification per bill without diffing old and new schedules.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::{
    NotificationAction, NotificationCategory, NotificationMapStore, NotificationRequest, Notifier,
    NotifyError, ReminderError, Trigger, Urgency,
};
use crate::bill::Bill;
use crate::clock::Clock;
use crate::config::{BillSyncConfig, ACTION_MARK_PAID, ACTION_SNOOZE};
use crate::crypto::envelope::is_envelope_shaped;
use crate::storage::StorageError;

/// Which kind of reminder a bill gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    /// Past due: repeats daily until the bill is paid or removed.
    Overdue,
    /// Not yet due: fires once, `reminder_offset_days` before the due date.
    Upcoming,
}

/// Why no notification was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Status is not `active`.
    Inactive,
    /// Snoozed until a future instant.
    Snoozed,
    /// The reminder time has already passed without being delivered.
    WindowElapsed,
    /// The local reminder time has no instant in the device time zone.
    UnresolvableTime,
}

/// Decision for a single bill, computed fresh from the bill and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderPlan {
    Skip(SkipReason),
    Overdue { hour: u32, minute: u32 },
    Upcoming { fire_at: DateTime<Utc> },
}

/// What [`SchedulerSession::schedule`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Scheduled {
        notification_id: String,
        kind: ReminderKind,
    },
    Skipped(SkipReason),
}

/// Decides what reminder `bill` should have right now.
///
/// Due dates are compared as local calendar days, so "overdue" flips at the
/// device's local midnight.
pub fn plan_reminder(bill: &Bill, clock: &dyn Clock) -> ReminderPlan {
    if !bill.is_active() {
        return ReminderPlan::Skip(SkipReason::Inactive);
    }

    let now = clock.now();
    if bill.is_snoozed_at(now) {
        return ReminderPlan::Skip(SkipReason::Snoozed);
    }

    let time = bill.reminder_time_local;
    if bill.due_date < clock.today() {
        return ReminderPlan::Overdue {
            hour: time.hour(),
            minute: time.minute(),
        };
    }

    let local_fire =
        bill.due_date.and_time(time) - Duration::days(i64::from(bill.reminder_offset()));
    match clock.resolve_local(local_fire) {
        None => ReminderPlan::Skip(SkipReason::UnresolvableTime),
        Some(fire_at) if fire_at <= now => ReminderPlan::Skip(SkipReason::WindowElapsed),
        Some(fire_at) => ReminderPlan::Upcoming { fire_at },
    }
}

fn display_creditor(creditor: &str) -> &str {
    // Never put ciphertext on the lock screen.
    if creditor.trim().is_empty() || is_envelope_shaped(creditor) {
        "A bill"
    } else {
        creditor
    }
}

fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}

fn format_due(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Issues and cancels the local notification for individual bills.
///
/// All paths that touch notifications or the map go through a
/// [`SchedulerSession`], which holds the scheduler's lock.
pub struct NotificationScheduler {
    notifier: Arc<dyn Notifier>,
    map: NotificationMapStore,
    clock: Arc<dyn Clock>,
    overdue_category: String,
    upcoming_category: String,
    lock: Mutex<()>,
}

impl NotificationScheduler {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        map: NotificationMapStore,
        clock: Arc<dyn Clock>,
        config: &BillSyncConfig,
    ) -> Self {
        Self {
            notifier,
            map,
            clock,
            overdue_category: config.overdue_category.clone(),
            upcoming_category: config.upcoming_category.clone(),
            lock: Mutex::new(()),
        }
    }

    /// Waits for exclusive access to notifications and the map.
    pub async fn session(&self) -> SchedulerSession<'_> {
        SchedulerSession {
            scheduler: self,
            _guard: self.lock.lock().await,
        }
    }

    /// Cancels and recomputes the reminder for one bill.
    pub async fn schedule_bill_reminder(
        &self,
        bill: &Bill,
    ) -> Result<ScheduleOutcome, ReminderError> {
        self.session().await.schedule(bill).await
    }

    /// Cancels the reminder for one bill, returning the cancelled id if any.
    pub async fn cancel_bill_reminder(&self, bill_id: &str) -> Result<Option<String>, ReminderError> {
        self.session().await.cancel(bill_id).await
    }

    /// Registers the notification categories and their action buttons.
    pub async fn register_categories(&self) -> Result<(), ReminderError> {
        let overdue = NotificationCategory {
            id: self.overdue_category.clone(),
            actions: vec![
                NotificationAction {
                    id: ACTION_MARK_PAID.to_string(),
                    title: "Mark Paid".to_string(),
                    opens_app: false,
                },
                NotificationAction {
                    id: ACTION_SNOOZE.to_string(),
                    title: "Snooze 1 hour".to_string(),
                    opens_app: false,
                },
            ],
        };
        let upcoming = NotificationCategory {
            id: self.upcoming_category.clone(),
            actions: Vec::new(),
        };

        self.notifier.register_category(&overdue).await?;
        self.notifier.register_category(&upcoming).await?;
        Ok(())
    }

    /// Shows a notification right away. Not tied to any bill.
    pub async fn notify_now(&self, title: &str, body: &str) -> Result<String, ReminderError> {
        let request = NotificationRequest {
            title: title.to_string(),
            body: body.to_string(),
            bill_id: None,
            category: None,
            urgency: Urgency::Default,
            trigger: Trigger::Immediate,
        };
        Ok(self.notifier.schedule(&request).await?)
    }

    /// Removes a delivered notification from the tray; missing ones are ignored.
    pub async fn dismiss(&self, notification_id: &str) -> Result<(), ReminderError> {
        match self.notifier.dismiss(notification_id).await {
            Ok(()) | Err(NotifyError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn permission_granted(&self) -> Result<bool, ReminderError> {
        Ok(self.notifier.permission_granted().await?)
    }

    pub fn map(&self) -> &NotificationMapStore {
        &self.map
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn request_for(&self, bill: &Bill, kind: ReminderKind, trigger: Trigger) -> NotificationRequest {
        let creditor = display_creditor(&bill.creditor);
        let amount = format_amount(bill.amount_cents);
        let due = format_due(bill.due_date);

        match kind {
            ReminderKind::Overdue => NotificationRequest {
                title: format!("Overdue: {}", creditor),
                body: format!("{} was due {}.", amount, due),
                bill_id: Some(bill.id.clone()),
                category: Some(self.overdue_category.clone()),
                urgency: Urgency::High,
                trigger,
            },
            ReminderKind::Upcoming => NotificationRequest {
                title: format!("{} due soon", creditor),
                body: format!("{} due {}.", amount, due),
                bill_id: Some(bill.id.clone()),
                category: Some(self.upcoming_category.clone()),
                urgency: Urgency::Default,
                trigger,
            },
        }
    }
}

/// Exclusive handle on the scheduler. Dropping it releases the lock.
pub struct SchedulerSession<'a> {
    scheduler: &'a NotificationScheduler,
    _guard: MutexGuard<'a, ()>,
}

impl SchedulerSession<'_> {
    /// Cancels any existing reminder for `bill`, then schedules a new one if
    /// the bill still needs it.
    pub async fn schedule(&self, bill: &Bill) -> Result<ScheduleOutcome, ReminderError> {
        self.cancel(&bill.id).await?;

        let (kind, trigger) = match plan_reminder(bill, self.scheduler.clock()) {
            ReminderPlan::Skip(reason) => {
                debug!(bill_id = %bill.id, ?reason, "no reminder scheduled");
                return Ok(ScheduleOutcome::Skipped(reason));
            }
            ReminderPlan::Overdue { hour, minute } => {
                (ReminderKind::Overdue, Trigger::Daily { hour, minute })
            }
            ReminderPlan::Upcoming { fire_at } => (ReminderKind::Upcoming, Trigger::At(fire_at)),
        };
        let request = self.scheduler.request_for(bill, kind, trigger);

        let notification_id = self.scheduler.notifier.schedule(&request).await?;
        if let Err(e) = self.scheduler.map.set(&bill.id, &notification_id) {
            // An unmapped notification can never be cancelled again.
            if let Err(cancel_err) = self.scheduler.notifier.cancel(&notification_id).await {
                warn!(
                    bill_id = %bill.id,
                    notification_id = %notification_id,
                    error = %cancel_err,
                    "could not roll back unmapped reminder"
                );
            }
            return Err(e.into());
        }

        info!(
            bill_id = %bill.id,
            notification_id = %notification_id,
            ?kind,
            trigger = ?request.trigger,
            "reminder scheduled"
        );
        Ok(ScheduleOutcome::Scheduled {
            notification_id,
            kind,
        })
    }

    /// Cancels the bill's notification if one is mapped, then drops the mapping.
    ///
    /// A notification the platform no longer knows (a one-shot that already
    /// fired) counts as cancelled. Any other failure keeps the mapping so the
    /// next pass can retry.
    pub async fn cancel(&self, bill_id: &str) -> Result<Option<String>, ReminderError> {
        let Some(notification_id) = self.scheduler.map.get(bill_id)? else {
            return Ok(None);
        };

        match self.scheduler.notifier.cancel(&notification_id).await {
            Ok(()) => {}
            Err(NotifyError::NotFound(_)) => {
                debug!(bill_id, notification_id = %notification_id, "notification already gone");
            }
            Err(e) => return Err(e.into()),
        }

        self.scheduler.map.remove(bill_id)?;
        Ok(Some(notification_id))
    }

    /// Current mappings.
    pub fn mappings(&self) -> Result<Vec<(String, String)>, StorageError> {
        self.scheduler.map.list_all()
    }
}
