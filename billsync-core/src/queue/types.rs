// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Queue item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bill::{BillDraft, BillPatch};

/// Kind of queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationType {
    Create,
    Update,
    Delete,
    MarkPaid,
}

/// A pending write with its operation-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutation {
    Create { bill: BillDraft },
    Update { bill_id: String, patch: BillPatch },
    Delete { bill_id: String },
    MarkPaid { bill_id: String },
}

impl Mutation {
    pub fn mutation_type(&self) -> MutationType {
        match self {
            Mutation::Create { .. } => MutationType::Create,
            Mutation::Update { .. } => MutationType::Update,
            Mutation::Delete { .. } => MutationType::Delete,
            Mutation::MarkPaid { .. } => MutationType::MarkPaid,
        }
    }

    /// The bill this mutation targets; None for creates.
    pub fn bill_id(&self) -> Option<&str> {
        match self {
            Mutation::Create { .. } => None,
            Mutation::Update { bill_id, .. }
            | Mutation::Delete { bill_id }
            | Mutation::MarkPaid { bill_id } => Some(bill_id),
        }
    }
}

/// One entry of the persisted queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationQueueItem {
    /// Random token; also sent as the idempotency key.
    pub id: String,
    #[serde(flatten)]
    pub mutation: Mutation,
    pub timestamp: DateTime<Utc>,
}

/// A mutation the server rejected permanently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub item: MutationQueueItem,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Result of one [`super::MutationQueue::process`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    /// True if the pass was skipped because the device is offline.
    pub skipped_offline: bool,
    /// Items the server accepted, now removed from the queue.
    pub applied: usize,
    /// Items kept for a later pass.
    pub retained: usize,
    /// Items moved to the dead-letter list during this pass.
    pub dead_lettered: Vec<DeadLetter>,
}
