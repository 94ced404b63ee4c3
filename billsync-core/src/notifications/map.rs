// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persisted bill id -> notification id map.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::storage::kv::{load_json, save_json};
use crate::storage::{KeyValueStore, StorageError};

type NotificationMap = BTreeMap<String, String>;

/// Single JSON object mapping each bill with a live reminder to its
/// notification id.
///
/// Every operation reads and rewrites the whole object. Callers serialize
/// access; [`super::NotificationScheduler`] is the only writer.
#[derive(Clone)]
pub struct NotificationMapStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl NotificationMapStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    fn load(&self) -> Result<NotificationMap, StorageError> {
        load_json(self.store.as_ref(), &self.key)
    }

    fn save(&self, map: &NotificationMap) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), &self.key, map)
    }

    pub fn get(&self, bill_id: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(bill_id))
    }

    pub fn set(&self, bill_id: &str, notification_id: &str) -> Result<(), StorageError> {
        let mut map = self.load()?;
        map.insert(bill_id.to_string(), notification_id.to_string());
        self.save(&map)
    }

    /// Removes the mapping for `bill_id`, returning the notification id it held.
    pub fn remove(&self, bill_id: &str) -> Result<Option<String>, StorageError> {
        let mut map = self.load()?;
        let removed = map.remove(bill_id);
        if removed.is_some() {
            self.save(&map)?;
        }
        Ok(removed)
    }

    /// All mappings, ordered by bill id.
    pub fn list_all(&self) -> Result<Vec<(String, String)>, StorageError> {
        Ok(self.load()?.into_iter().collect())
    }
}
