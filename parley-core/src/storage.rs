//! The storage protocol — versioned state that outlives a turn.

use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Version tag that disables the conflict check for one write.
pub const ETAG_ANY: &str = "*";

/// A stored payload and its version tag.
///
/// On write, `e_tag` is the version the caller last saw: `None` for a
/// record it believes is new, [`ETAG_ANY`] to overwrite unconditionally.
/// On read, it is the version the store assigned on the last write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreItem {
    /// The state payload.
    pub value: serde_json::Value,
    /// Version tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e_tag: Option<String>,
}

impl StoreItem {
    /// An item with no version tag (a new record).
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, e_tag: None }
    }

    /// An item carrying the given version tag.
    pub fn with_e_tag(value: serde_json::Value, e_tag: impl Into<String>) -> Self {
        Self {
            value,
            e_tag: Some(e_tag.into()),
        }
    }

    /// An item that overwrites whatever is stored.
    pub fn unconditional(value: serde_json::Value) -> Self {
        Self::with_e_tag(value, ETAG_ANY)
    }
}

/// A batch of items keyed by storage key.
pub type StoreItems = HashMap<String, StoreItem>;

/// Key/value persistence with optimistic concurrency.
///
/// The store is the one component shared by concurrent turns; every
/// implementation must make each call atomic with respect to its
/// version-tag bookkeeping.
///
/// Implementations:
/// - MemoryStorage: `HashMap` behind a lock (`parley-state-memory`)
/// - File, database and cache backends implement the same contract
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the given keys. Missing keys are absent from the result, not an
    /// error.
    async fn read(&self, keys: &[&str]) -> Result<StoreItems, StorageError>;

    /// Write a batch. A key whose tag is neither [`ETAG_ANY`] nor the
    /// stored tag fails with [`StorageError::Conflict`]. The store assigns a
    /// fresh tag to every record it writes.
    async fn write(&self, changes: StoreItems) -> Result<(), StorageError>;

    /// Delete the given keys. Missing keys are a no-op.
    async fn delete(&self, keys: &[&str]) -> Result<(), StorageError>;
}
