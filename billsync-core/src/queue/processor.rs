// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Draining the mutation queue against the remote service.

use tracing::{debug, info, warn};

use super::remote::RemoteError;
use super::types::{DeadLetter, Mutation, MutationQueueItem, ProcessReport};
use super::{MutationQueue, QueueError};

impl MutationQueue {
    /// Sends every queued mutation to the remote service, in order.
    ///
    /// Does nothing while offline. Accepted items are dropped, permanently
    /// rejected ones move to the dead-letter list, and everything else stays
    /// queued unchanged. The queue is written once, after the whole pass, so
    /// a crash mid-pass leaves the previous queue on disk and already-applied
    /// items are sent again (at-least-once).
    pub async fn process(&self) -> Result<ProcessReport, QueueError> {
        if !self.connectivity.is_connected().await {
            debug!("offline, queue flush skipped");
            return Ok(ProcessReport {
                skipped_offline: true,
                ..Default::default()
            });
        }

        let _guard = self.lock.lock().await;

        let items = self.load_items()?;
        if items.is_empty() {
            return Ok(ProcessReport::default());
        }

        let mut report = ProcessReport::default();
        let mut retained = Vec::new();

        for item in items {
            match self.dispatch(&item).await {
                Ok(()) => {
                    debug!(item_id = %item.id, "mutation applied");
                    report.applied += 1;
                }
                Err(e) if e.is_permanent() => {
                    warn!(
                        item_id = %item.id,
                        kind = ?item.mutation.mutation_type(),
                        error = %e,
                        "mutation rejected permanently, moving to dead letters"
                    );
                    report.dead_lettered.push(DeadLetter {
                        item,
                        error: e.message,
                        failed_at: self.clock.now(),
                    });
                }
                Err(e) => {
                    debug!(item_id = %item.id, error = %e, kind = ?e.kind, "mutation kept for retry");
                    retained.push(item);
                }
            }
        }

        if !report.dead_lettered.is_empty() {
            let mut letters = self.load_dead_letters()?;
            for letter in &report.dead_lettered {
                if !letters.iter().any(|l| l.item.id == letter.item.id) {
                    letters.push(letter.clone());
                }
            }
            self.save_dead_letters(&letters)?;
        }

        report.retained = retained.len();
        self.save_items(&retained)?;

        info!(
            applied = report.applied,
            retained = report.retained,
            dead_lettered = report.dead_lettered.len(),
            "queue flush complete"
        );
        Ok(report)
    }

    async fn dispatch(&self, item: &MutationQueueItem) -> Result<(), RemoteError> {
        let key = item.id.as_str();
        match &item.mutation {
            Mutation::Create { bill } => self.remote.create(bill, key).await,
            Mutation::Update { bill_id, patch } => self.remote.update(bill_id, patch, key).await,
            Mutation::Delete { bill_id } => self.remote.delete(bill_id, key).await,
            Mutation::MarkPaid { bill_id } => self.remote.mark_paid(bill_id, key).await,
        }
    }
}
