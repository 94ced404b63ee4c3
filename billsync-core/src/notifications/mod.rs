// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Local Reminder Notifications
//!
//! Keeps exactly one live local notification per active bill:
//! - [`NotificationMapStore`] persists bill id -> notification id
//! - [`NotificationScheduler`] (re)schedules a single bill
//! - [`ReminderSyncOrchestrator`] rebuilds state from a full bill list
//!
//! The platform notification API is the [`Notifier`] collaborator.

mod map;
mod resync;
mod scheduler;

pub use map::NotificationMapStore;
pub use resync::{ReminderSyncOrchestrator, ResyncReport};
pub use scheduler::{
    plan_reminder, NotificationScheduler, ReminderKind, ReminderPlan, ScheduleOutcome,
    SchedulerSession, SkipReason,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::storage::StorageError;

/// Errors reported by the platform notification API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The notification no longer exists (already fired or removed).
    #[error("notification not found: {0}")]
    NotFound(String),

    #[error("notification permission not granted")]
    PermissionDenied,

    #[error("platform notification error: {0}")]
    Platform(String),
}

/// Errors from scheduling and resync.
#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("notification permission not granted")]
    PermissionDenied,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// When a notification fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Deliver right away.
    Immediate,
    /// One-shot at an absolute instant.
    At(DateTime<Utc>),
    /// Every day at a local time of day.
    Daily { hour: u32, minute: u32 },
}

/// Presentation priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Urgency {
    #[default]
    Default,
    High,
}

/// A notification to hand to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    /// Bill this notification belongs to, echoed back with action responses.
    pub bill_id: Option<String>,
    pub category: Option<String>,
    pub urgency: Urgency,
    pub trigger: Trigger,
}

/// An interactive button on a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub id: String,
    pub title: String,
    /// Whether tapping the action brings the app to the foreground.
    pub opens_app: bool,
}

/// A named set of actions a notification can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationCategory {
    pub id: String,
    pub actions: Vec<NotificationAction>,
}

/// Platform local-notification API.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether the user has authorized notifications.
    async fn permission_granted(&self) -> Result<bool, NotifyError>;

    /// Registers (or replaces) a category and its actions.
    async fn register_category(&self, category: &NotificationCategory) -> Result<(), NotifyError>;

    /// Schedules a notification and returns its platform id.
    async fn schedule(&self, request: &NotificationRequest) -> Result<String, NotifyError>;

    /// Cancels a pending notification.
    async fn cancel(&self, notification_id: &str) -> Result<(), NotifyError>;

    /// Removes a delivered notification from the notification tray.
    async fn dismiss(&self, notification_id: &str) -> Result<(), NotifyError>;
}
