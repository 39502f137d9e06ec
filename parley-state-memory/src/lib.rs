#![deny(missing_docs)]
//! In-memory implementation of parley-core's Storage trait.
//!
//! Uses a `HashMap` behind a single `RwLock`, so reads see a consistent
//! snapshot and version-tag increments are serialized. Version tags come
//! from one store-wide counter and are rendered as decimal strings.
//!
//! A write batch is checked in full before anything is applied: if any key
//! conflicts, the batch fails with every conflicting key listed and no key
//! is updated.

use async_trait::async_trait;
use parley_core::error::{ETagConflict, StorageError};
use parley_core::storage::{ETAG_ANY, Storage, StoreItem, StoreItems};
use std::collections::HashMap;
use tokio::sync::RwLock;

struct Records {
    items: HashMap<String, StoreItem>,
    next_e_tag: u64,
}

/// In-memory storage backed by a `HashMap` behind a `RwLock`.
///
/// Suitable for testing, prototyping, and single-process use cases
/// where persistence across restarts is not required.
pub struct MemoryStorage {
    records: RwLock<Records>,
}

impl MemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::from_items(StoreItems::new())
    }

    /// Create a store seeded with `items`.
    ///
    /// Seeded records keep the tags they were given. The counter resumes
    /// above the largest numeric seeded tag, so a snapshot taken from
    /// another `MemoryStorage` never sees one of its tags issued twice.
    pub fn from_items(items: StoreItems) -> Self {
        let next_e_tag = items
            .values()
            .filter_map(|item| item.e_tag.as_deref()?.parse::<u64>().ok())
            .max()
            .map_or(0, |max| max.saturating_add(1));
        Self {
            records: RwLock::new(Records { items, next_e_tag }),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Check one incoming item against the stored one.
///
/// A key with no stored record accepts any tag. An existing record
/// requires [`ETAG_ANY`] or its exact current tag; an absent tag means the
/// caller expected a new record, which is a conflict.
fn check(key: &str, incoming: &StoreItem, stored: Option<&StoreItem>) -> Option<ETagConflict> {
    let current = stored?.e_tag.as_deref()?;
    match incoming.e_tag.as_deref() {
        Some(ETAG_ANY) => None,
        Some(tag) if tag == current => None,
        provided => Some(ETagConflict {
            key: key.to_owned(),
            provided: provided.map(str::to_owned),
            current: current.to_owned(),
        }),
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, keys: &[&str]) -> Result<StoreItems, StorageError> {
        let records = self.records.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| {
                records
                    .items
                    .get(*key)
                    .map(|item| ((*key).to_owned(), item.clone()))
            })
            .collect())
    }

    async fn write(&self, changes: StoreItems) -> Result<(), StorageError> {
        let mut records = self.records.write().await;

        let mut conflicts: Vec<ETagConflict> = changes
            .iter()
            .filter_map(|(key, item)| check(key, item, records.items.get(key)))
            .collect();
        if !conflicts.is_empty() {
            conflicts.sort_by(|a, b| a.key.cmp(&b.key));
            tracing::debug!(count = conflicts.len(), "parley.storage.conflict");
            return Err(StorageError::Conflict(conflicts));
        }

        for (key, item) in changes {
            let e_tag = records.next_e_tag.to_string();
            records.next_e_tag += 1;
            records.items.insert(
                key,
                StoreItem {
                    value: item.value,
                    e_tag: Some(e_tag),
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        for key in keys {
            records.items.remove(*key);
        }
        Ok(())
    }
}
