// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Local time source.
//!
//! Reminder math runs in the device's local wall-clock time (calendar days
//! start at local midnight), while notification triggers are absolute
//! instants. The [`Clock`] trait owns both conversions so schedules follow the
//! device's current time zone.

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of "now" and of the local time zone.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Converts an instant to local wall-clock time.
    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime;

    /// Converts local wall-clock time to an instant.
    ///
    /// Returns None only if the zone cannot represent the time at all.
    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<Utc>>;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.to_local(self.now()).date()
    }
}

/// Resolves `local` in `tz`: ambiguous times take the earliest instant, times
/// inside a DST gap move forward to the first representable minute.
fn resolve_in<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    // Gaps are at most a few hours wide; look a day ahead at most.
    for minutes in 0..=24 * 60 {
        let candidate = local + Duration::minutes(minutes);
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.with_timezone(&Utc)),
            LocalResult::None => continue,
        }
    }
    None
}

/// The device clock and time zone.
///
/// The zone is read on every call, so a time-zone change is picked up by the
/// next reschedule.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&chrono::Local).naive_local()
    }

    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        resolve_in(&chrono::Local, local)
    }
}

/// Manually driven clock in a fixed UTC offset.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    offset: Mutex<FixedOffset>,
}

impl FixedClock {
    /// Creates a clock at `now` in the given offset.
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset: Mutex::new(offset),
        }
    }

    /// Creates a clock whose local wall time is `local` in `offset`.
    pub fn at_local(local: NaiveDateTime, offset: FixedOffset) -> Option<Self> {
        let now = offset.from_local_datetime(&local).single()?.with_timezone(&Utc);
        Some(Self::new(now, offset))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Simulates the device moving to another time zone.
    pub fn set_offset(&self, offset: FixedOffset) {
        *self.offset.lock() = offset;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&*self.offset.lock()).naive_local()
    }

    fn resolve_local(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        resolve_in(&*self.offset.lock(), local)
    }
}
