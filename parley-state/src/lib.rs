#![deny(missing_docs)]
//! Typed turn state for parley.
//!
//! A [`TurnState`] binds one named state slot to a [`Storage`](parley_core::Storage)
//! backend and a rule that derives the storage key from the turn. Used as
//! middleware it loads the slot before the rest of the chain runs, attaches
//! it to the turn's services under its name, and saves it once the chain
//! unwinds.
//!
//! ```ignore
//! let storage = Arc::new(MemoryStorage::new());
//! let state = TurnState::<Counter>::conversation(storage, "counter", StateSettings::default())?;
//! set.use_middleware(state);
//!
//! // Later, inside a handler or the bot:
//! let handle = ctx.services().require::<StateSlot<Counter>>("counter")?;
//! handle.lock().await.value.turns += 1;
//! ```

pub mod settings;
pub mod turn_state;

pub use settings::{ConflictPolicy, StateSettings};
pub use turn_state::{KeyFn, StateEntry, StateHandle, StateSlot, TurnState};
