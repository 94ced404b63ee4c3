// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bill model
//!
//! Bills are owned by the remote service. This crate only reads them to derive
//! reminder state, and builds [`BillDraft`]/[`BillPatch`] payloads for queued
//! mutations. The creditor is sensitive and travels in envelope form.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::crypto::{CryptoError, FieldEnvelope};

/// Largest supported reminder lead time.
pub const MAX_REMINDER_OFFSET_DAYS: u8 = 3;

/// Lifecycle status of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Active,
    Paid,
    Archived,
}

/// How a bill gets paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Manual,
    Auto,
}

/// Recurrence descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    #[serde(rename = "none")]
    OneTime,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
    /// Any descriptor this version does not know.
    #[serde(other)]
    Other,
}

/// A bill as returned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    /// Envelope-encrypted or legacy plaintext.
    pub creditor: String,
    /// Minor currency units.
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub status: BillStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub reminder_offset_days: u8,
    #[serde(default = "default_reminder_time", with = "hm_time")]
    pub reminder_time_local: NaiveTime,
    #[serde(default)]
    pub snoozed_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Bill {
    pub fn is_active(&self) -> bool {
        self.status == BillStatus::Active
    }

    /// Reminder lead time, clamped to the supported range.
    pub fn reminder_offset(&self) -> u8 {
        self.reminder_offset_days.min(MAX_REMINDER_OFFSET_DAYS)
    }

    /// True if a snooze is set and still in the future at `now`.
    pub fn is_snoozed_at(&self, now: DateTime<Utc>) -> bool {
        self.snoozed_until.is_some_and(|until| until > now)
    }

    /// Returns a copy with sensitive fields decrypted for display.
    pub fn opened(&self, envelope: &FieldEnvelope) -> Bill {
        Bill {
            creditor: envelope.decrypt(&self.creditor),
            ..self.clone()
        }
    }
}

/// Payload for creating a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDraft {
    pub creditor: String,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub reminder_offset_days: u8,
    #[serde(default = "default_reminder_time", with = "hm_time")]
    pub reminder_time_local: NaiveTime,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl BillDraft {
    /// Returns a copy with the creditor encrypted for transport.
    pub fn sealed(&self, envelope: &FieldEnvelope) -> Result<BillDraft, CryptoError> {
        Ok(BillDraft {
            creditor: envelope.encrypt(&self.creditor)?,
            ..self.clone()
        })
    }
}

/// Partial update for an existing bill. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creditor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BillStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_offset_days: Option<u8>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "hm_time::option"
    )]
    pub reminder_time_local: Option<NaiveTime>,
    /// `Some(None)` clears the snooze, `None` leaves it alone.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub snoozed_until: Option<Option<DateTime<Utc>>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub end_date: Option<Option<NaiveDate>>,
}

impl BillPatch {
    /// Patch that snoozes a bill until `until`.
    pub fn snooze(until: DateTime<Utc>) -> Self {
        BillPatch {
            snoozed_until: Some(Some(until)),
            ..Default::default()
        }
    }

    /// Returns a copy with the creditor (if present) encrypted for transport.
    pub fn sealed(&self, envelope: &FieldEnvelope) -> Result<BillPatch, CryptoError> {
        let creditor = match &self.creditor {
            Some(creditor) => Some(envelope.encrypt(creditor)?),
            None => None,
        };
        Ok(BillPatch {
            creditor,
            ..self.clone()
        })
    }

    /// Applies this patch to a bill in place.
    pub fn apply_to(&self, bill: &mut Bill) {
        if let Some(creditor) = &self.creditor {
            bill.creditor = creditor.clone();
        }
        if let Some(amount) = self.amount_cents {
            bill.amount_cents = amount;
        }
        if let Some(due) = self.due_date {
            bill.due_date = due;
        }
        if let Some(status) = self.status {
            bill.status = status;
        }
        if let Some(method) = self.payment_method {
            bill.payment_method = method;
        }
        if let Some(recurrence) = self.recurrence {
            bill.recurrence = recurrence;
        }
        if let Some(offset) = self.reminder_offset_days {
            bill.reminder_offset_days = offset;
        }
        if let Some(time) = self.reminder_time_local {
            bill.reminder_time_local = time;
        }
        if let Some(snoozed) = self.snoozed_until {
            bill.snoozed_until = snoozed;
        }
        if let Some(end) = self.end_date {
            bill.end_date = end;
        }
    }
}

fn default_reminder_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Remote ids may arrive as numbers or strings; they are keyed as strings.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// `HH:MM` wire format for local times of day; `HH:MM:SS` is accepted too.
mod hm_time {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid time of day: {raw}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid time of day: {raw}"))),
                None => Ok(None),
            }
        }
    }
}
