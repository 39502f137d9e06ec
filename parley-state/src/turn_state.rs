//! TurnState — one named state slot bridged between a turn and a store.

use crate::settings::{ConflictPolicy, StateSettings};
use parley_core::{
    BoxFuture, ETAG_ANY, Storage, StorageError, StoreItem, StoreItems, TurnContext, TurnError,
    ValidationError,
};
use parley_middleware::{Middleware, Next};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// Derives a storage key from the turn.
pub type KeyFn = Arc<dyn Fn(&TurnContext) -> Result<String, ValidationError> + Send + Sync>;

/// A state value and the version tag it was read with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateEntry<T> {
    /// The state.
    pub value: T,
    /// Tag of the stored record this value was read from; `None` if no
    /// record existed.
    pub e_tag: Option<String>,
}

/// What [`TurnState::load`] attaches to the turn's services.
pub type StateSlot<T> = tokio::sync::Mutex<StateEntry<T>>;

/// Shared handle to an attached state slot.
pub type StateHandle<T> = Arc<StateSlot<T>>;

/// A named state slot of type `T`, stored under a key derived from each
/// turn.
///
/// Missing records load as `T::default()`. As [`Middleware`] it loads the
/// slot on the way in and saves it on the way out.
pub struct TurnState<T> {
    storage: Arc<dyn Storage>,
    name: String,
    key_fn: KeyFn,
    settings: StateSettings,
    _state: PhantomData<fn() -> T>,
}

impl<T> TurnState<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    /// Create a slot named `name`, keyed by `key_fn`.
    ///
    /// The name is the turn-services key the loaded state is attached
    /// under and must not be empty.
    pub fn new(
        storage: Arc<dyn Storage>,
        name: impl Into<String>,
        key_fn: impl Fn(&TurnContext) -> Result<String, ValidationError> + Send + Sync + 'static,
        settings: StateSettings,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::new("state name must not be empty"));
        }
        Ok(Self {
            storage,
            name,
            key_fn: Arc::new(key_fn),
            settings,
            _state: PhantomData,
        })
    }

    /// Per-conversation state, keyed `{channel}/conversations/{conversation}`.
    pub fn conversation(
        storage: Arc<dyn Storage>,
        name: impl Into<String>,
        settings: StateSettings,
    ) -> Result<Self, ValidationError> {
        Self::new(storage, name, conversation_key, settings)
    }

    /// Per-user state, keyed `{channel}/users/{user}`.
    pub fn user(
        storage: Arc<dyn Storage>,
        name: impl Into<String>,
        settings: StateSettings,
    ) -> Result<Self, ValidationError> {
        Self::new(storage, name, user_key, settings)
    }

    /// The turn-services name the state is attached under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Persistence options.
    pub fn settings(&self) -> &StateSettings {
        &self.settings
    }

    /// The storage key for this turn.
    pub fn key(&self, ctx: &TurnContext) -> Result<String, ValidationError> {
        (self.key_fn)(ctx)
    }

    /// Read the state for this turn without attaching it.
    pub async fn read(&self, ctx: &TurnContext) -> Result<StateEntry<T>, TurnError> {
        let key = self.key(ctx)?;
        ensure_live(ctx)?;

        let mut items = self.storage.read(&[key.as_str()]).await?;
        let entry = match items.remove(&key) {
            Some(item) => StateEntry {
                value: serde_json::from_value(item.value).map_err(StorageError::from)?,
                e_tag: item.e_tag,
            },
            None => StateEntry::default(),
        };
        tracing::debug!(
            state = %self.name,
            key = %key,
            found = entry.e_tag.is_some(),
            "parley.state.read"
        );
        Ok(entry)
    }

    /// Read the state and attach it to the turn's services under
    /// [`name`](Self::name), replacing any earlier attachment.
    pub async fn load(&self, ctx: &TurnContext) -> Result<StateHandle<T>, TurnError> {
        let handle: StateHandle<T> = Arc::new(tokio::sync::Mutex::new(self.read(ctx).await?));
        ctx.services().insert_arc(self.name.clone(), handle.clone());
        Ok(handle)
    }

    /// The attached state, if this turn loaded it.
    pub fn get(&self, ctx: &TurnContext) -> Result<Option<StateHandle<T>>, ValidationError> {
        ctx.services().get::<StateSlot<T>>(&self.name)
    }

    /// Write `entry` for this turn.
    ///
    /// Under [`ConflictPolicy::LastWriterWins`] the write is unconditional;
    /// under [`ConflictPolicy::Strict`] it carries the entry's tag and a
    /// conflict is returned as is.
    pub async fn save(&self, ctx: &TurnContext, entry: &StateEntry<T>) -> Result<(), TurnError> {
        let key = self.key(ctx)?;
        ensure_live(ctx)?;

        let e_tag = match self.settings.conflict_policy {
            ConflictPolicy::LastWriterWins => Some(ETAG_ANY.to_owned()),
            ConflictPolicy::Strict => entry.e_tag.clone(),
        };
        let value = serde_json::to_value(&entry.value).map_err(StorageError::from)?;
        let mut changes = StoreItems::new();
        changes.insert(key.clone(), StoreItem { value, e_tag });

        self.storage.write(changes).await?;
        tracing::debug!(
            state = %self.name,
            key = %key,
            policy = ?self.settings.conflict_policy,
            "parley.state.save"
        );
        Ok(())
    }

    /// Save the attached state.
    ///
    /// Fails with a validation error if nothing is attached under
    /// [`name`](Self::name).
    pub async fn save_attached(&self, ctx: &TurnContext) -> Result<(), TurnError> {
        let handle = ctx.services().require::<StateSlot<T>>(&self.name)?;
        let entry = handle.lock().await;
        self.save(ctx, &entry).await
    }

    /// Delete the stored record for this turn. An attached value is left
    /// as is.
    pub async fn delete(&self, ctx: &TurnContext) -> Result<(), TurnError> {
        let key = self.key(ctx)?;
        ensure_live(ctx)?;
        self.storage.delete(&[key.as_str()]).await?;
        tracing::debug!(state = %self.name, key = %key, "parley.state.delete");
        Ok(())
    }
}

impl<T> Middleware for TurnState<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync + 'static,
{
    fn on_turn<'a>(
        &'a self,
        ctx: &'a TurnContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            self.load(ctx).await?;
            match next.run(ctx).await {
                Ok(()) => self.save_attached(ctx).await,
                Err(e) => {
                    if self.settings.save_on_fault && !e.is_cancelled() {
                        if let Err(save_err) = self.save_attached(ctx).await {
                            tracing::warn!(
                                state = %self.name,
                                error = %save_err,
                                "parley.state.save_failed"
                            );
                        }
                    }
                    Err(e)
                }
            }
        })
    }
}

impl<T> std::fmt::Debug for TurnState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnState")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn ensure_live(ctx: &TurnContext) -> Result<(), StorageError> {
    if ctx.is_cancelled() {
        return Err(StorageError::Cancelled);
    }
    Ok(())
}

fn conversation_key(ctx: &TurnContext) -> Result<String, ValidationError> {
    let activity = ctx.activity();
    if activity.channel_id.is_empty() {
        return Err(ValidationError::new("activity has no channel id"));
    }
    if activity.conversation.id.is_empty() {
        return Err(ValidationError::new("activity has no conversation id"));
    }
    Ok(format!(
        "{}/conversations/{}",
        activity.channel_id, activity.conversation.id
    ))
}

fn user_key(ctx: &TurnContext) -> Result<String, ValidationError> {
    let activity = ctx.activity();
    if activity.channel_id.is_empty() {
        return Err(ValidationError::new("activity has no channel id"));
    }
    if activity.from.id.is_empty() {
        return Err(ValidationError::new("activity has no sender id"));
    }
    Ok(format!("{}/users/{}", activity.channel_id, activity.from.id))
}
