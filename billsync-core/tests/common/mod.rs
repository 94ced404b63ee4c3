// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use billsync_core::notifications::NotificationCategory;
use billsync_core::{
    Bill, BillDraft, BillPatch, BillStatus, ConnectivityProbe, FixedClock, MutationType,
    NotificationRequest, Notifier, NotifyError, PaymentMethod, Recurrence, RemoteBillService,
    RemoteError,
};
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use parking_lot::Mutex;

// ============================================================
// Notifier
// ============================================================

#[derive(Default)]
struct NotifierState {
    next_id: usize,
    live: HashMap<String, NotificationRequest>,
    scheduled: Vec<(String, NotificationRequest)>,
    cancelled: Vec<String>,
    dismissed: Vec<String>,
    categories: Vec<NotificationCategory>,
    fail_for_bill: HashSet<String>,
}

/// Records every call and keeps the set of live notifications.
pub struct RecordingNotifier {
    granted: AtomicBool,
    state: Mutex<NotifierState>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            granted: AtomicBool::new(true),
            state: Mutex::new(NotifierState::default()),
        })
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    /// Makes `schedule` fail for notifications about this bill.
    pub fn fail_for_bill(&self, bill_id: &str) {
        self.state.lock().fail_for_bill.insert(bill_id.to_string());
    }

    /// Drops a live notification as if it had fired.
    pub fn fire(&self, notification_id: &str) {
        self.state.lock().live.remove(notification_id);
    }

    pub fn live(&self) -> HashMap<String, NotificationRequest> {
        self.state.lock().live.clone()
    }

    pub fn live_for_bill(&self, bill_id: &str) -> Vec<NotificationRequest> {
        self.state
            .lock()
            .live
            .values()
            .filter(|r| r.bill_id.as_deref() == Some(bill_id))
            .cloned()
            .collect()
    }

    pub fn scheduled(&self) -> Vec<(String, NotificationRequest)> {
        self.state.lock().scheduled.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.state.lock().cancelled.clone()
    }

    pub fn dismissed(&self) -> Vec<String> {
        self.state.lock().dismissed.clone()
    }

    pub fn categories(&self) -> Vec<NotificationCategory> {
        self.state.lock().categories.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn permission_granted(&self) -> Result<bool, NotifyError> {
        Ok(self.granted.load(Ordering::SeqCst))
    }

    async fn register_category(&self, category: &NotificationCategory) -> Result<(), NotifyError> {
        let mut state = self.state.lock();
        state.categories.retain(|c| c.id != category.id);
        state.categories.push(category.clone());
        Ok(())
    }

    async fn schedule(&self, request: &NotificationRequest) -> Result<String, NotifyError> {
        let mut state = self.state.lock();
        if let Some(bill_id) = &request.bill_id {
            if state.fail_for_bill.contains(bill_id) {
                return Err(NotifyError::Platform("scheduling rejected".into()));
            }
        }
        state.next_id += 1;
        let id = format!("notif-{}", state.next_id);
        state.live.insert(id.clone(), request.clone());
        state.scheduled.push((id.clone(), request.clone()));
        Ok(id)
    }

    async fn cancel(&self, notification_id: &str) -> Result<(), NotifyError> {
        let mut state = self.state.lock();
        state.cancelled.push(notification_id.to_string());
        match state.live.remove(notification_id) {
            Some(_) => Ok(()),
            None => Err(NotifyError::NotFound(notification_id.to_string())),
        }
    }

    async fn dismiss(&self, notification_id: &str) -> Result<(), NotifyError> {
        self.state.lock().dismissed.push(notification_id.to_string());
        Ok(())
    }
}

// ============================================================
// Remote service
// ============================================================

/// One call received by [`ScriptedRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub kind: MutationType,
    /// Bill id, or the (sealed) creditor for creates.
    pub target: String,
    pub idempotency_key: String,
}

#[derive(Default)]
struct RemoteState {
    calls: Vec<RemoteCall>,
    scripted: VecDeque<Result<(), RemoteError>>,
    failing: HashMap<String, RemoteError>,
    bills: Vec<Bill>,
}

/// Remote service whose answers are scripted per call or per target.
#[derive(Default)]
pub struct ScriptedRemote {
    state: Mutex<RemoteState>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a response for the next mutation call. Unscripted calls succeed.
    pub fn push_response(&self, response: Result<(), RemoteError>) {
        self.state.lock().scripted.push_back(response);
    }

    /// Every mutation on `target` fails with `error` until cleared.
    pub fn fail_target(&self, target: &str, error: RemoteError) {
        self.state.lock().failing.insert(target.to_string(), error);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failing.clear();
    }

    pub fn set_bills(&self, bills: Vec<Bill>) {
        self.state.lock().bills = bills;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    fn record(&self, kind: MutationType, target: &str, key: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(RemoteCall {
            kind,
            target: target.to_string(),
            idempotency_key: key.to_string(),
        });
        if let Some(err) = state.failing.get(target) {
            return Err(err.clone());
        }
        state.scripted.pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait]
impl RemoteBillService for ScriptedRemote {
    async fn create(&self, draft: &BillDraft, idempotency_key: &str) -> Result<(), RemoteError> {
        self.record(MutationType::Create, &draft.creditor, idempotency_key)
    }

    async fn update(
        &self,
        bill_id: &str,
        _patch: &BillPatch,
        idempotency_key: &str,
    ) -> Result<(), RemoteError> {
        self.record(MutationType::Update, bill_id, idempotency_key)
    }

    async fn delete(&self, bill_id: &str, idempotency_key: &str) -> Result<(), RemoteError> {
        self.record(MutationType::Delete, bill_id, idempotency_key)
    }

    async fn mark_paid(&self, bill_id: &str, idempotency_key: &str) -> Result<(), RemoteError> {
        self.record(MutationType::MarkPaid, bill_id, idempotency_key)
    }

    async fn list(&self) -> Result<Vec<Bill>, RemoteError> {
        Ok(self.state.lock().bills.clone())
    }
}

// ============================================================
// Connectivity
// ============================================================

pub struct ToggleConnectivity {
    online: AtomicBool,
    checks: AtomicUsize,
}

impl ToggleConnectivity {
    pub fn new(online: bool) -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(online),
            checks: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityProbe for ToggleConnectivity {
    async fn is_connected(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }
}

// ============================================================
// Fixtures
// ============================================================

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Clock fixed at the given UTC wall time.
pub fn clock_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Arc<FixedClock> {
    let local = date(y, m, d).and_hms_opt(h, min, 0).unwrap();
    Arc::new(FixedClock::at_local(local, utc()).unwrap())
}

pub fn bill(id: &str, due: NaiveDate) -> Bill {
    Bill {
        id: id.to_string(),
        creditor: "Acme Power".to_string(),
        amount_cents: 4250,
        due_date: due,
        status: BillStatus::Active,
        payment_method: PaymentMethod::Manual,
        recurrence: Recurrence::Monthly,
        reminder_offset_days: 0,
        reminder_time_local: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        snoozed_until: None,
        end_date: None,
    }
}

pub fn draft(creditor: &str) -> BillDraft {
    BillDraft {
        creditor: creditor.to_string(),
        amount_cents: 1999,
        due_date: date(2026, 11, 1),
        payment_method: PaymentMethod::Manual,
        recurrence: Recurrence::OneTime,
        reminder_offset_days: 1,
        reminder_time_local: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_date: None,
    }
}
