#![deny(missing_docs)]
//! # parley — umbrella crate
//!
//! Provides a single import surface for parley. Re-exports the protocol
//! crate and the key implementations behind feature flags, plus a
//! `prelude` for the happy path.

#[cfg(feature = "adapter")]
pub use parley_adapter;
#[cfg(feature = "core")]
pub use parley_core;
#[cfg(feature = "middleware")]
pub use parley_middleware;
#[cfg(feature = "state")]
pub use parley_state;
#[cfg(feature = "state-memory")]
pub use parley_state_memory;

/// Happy-path imports for building bots.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use parley_core::{
        Activity, ActivityKind, Bot, ChannelAdapter, ConversationReference, DeliveryError,
        DurationMs, ResourceResponse, Storage, StorageError, TurnContext, TurnError, TurnStatus,
        ValidationError, bot_fn, send_hook_fn,
    };

    #[cfg(feature = "middleware")]
    pub use parley_middleware::{
        Middleware, MiddlewareSet, Next, ShowTypingMiddleware, TracingMiddleware, middleware_fn,
    };

    #[cfg(feature = "state")]
    pub use parley_state::{ConflictPolicy, StateSettings, StateSlot, TurnState};

    #[cfg(feature = "state-memory")]
    pub use parley_state_memory::MemoryStorage;

    #[cfg(feature = "adapter")]
    pub use parley_adapter::{AdapterConfig, TurnAdapter, TurnReport};
}
