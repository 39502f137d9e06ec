//! Turn services — named, typed values shared between handlers of one turn.

use crate::error::ValidationError;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Service = Arc<dyn Any + Send + Sync>;

/// A string-keyed registry of values attached to one turn.
///
/// Components pick stable slot names (state middleware uses its state
/// name) and later handlers retrieve the same instance by that name.
/// Lookups are typed: asking for the wrong type fails with a
/// [`ValidationError`] instead of quietly returning nothing.
#[derive(Default)]
pub struct TurnServices {
    slots: Mutex<HashMap<String, Service>>,
}

impl TurnServices {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Service>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.insert_arc(key, Arc::new(value));
    }

    /// Store an already shared value under `key`.
    pub fn insert_arc<T: Any + Send + Sync>(&self, key: impl Into<String>, value: Arc<T>) {
        self.slots().insert(key.into(), value);
    }

    /// Look up `key` as a `T`.
    ///
    /// Returns `Ok(None)` when nothing is stored under `key` (including the
    /// empty key) and an error when the stored value is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Result<Option<Arc<T>>, ValidationError> {
        let Some(service) = self.slots().get(key).cloned() else {
            return Ok(None);
        };
        service.downcast::<T>().map(Some).map_err(|_| {
            ValidationError::new(format!(
                "turn service '{key}' is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Look up `key` as a `T`, failing if it is missing.
    pub fn require<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, ValidationError> {
        self.get(key)?
            .ok_or_else(|| ValidationError::new(format!("turn service '{key}' is not set")))
    }

    /// Whether anything is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.slots().contains_key(key)
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.slots().remove(key).is_some()
    }
}

impl std::fmt::Debug for TurnServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self.slots().keys().cloned().collect();
        keys.sort();
        f.debug_struct("TurnServices").field("keys", &keys).finish()
    }
}
