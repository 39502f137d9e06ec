//! # parley-core — Turn protocol for conversational agents
//!
//! This crate defines the per-turn aggregate and the protocol boundaries
//! that every other parley crate composes against.
//!
//! ## The Boundaries
//!
//! | Boundary | Type | What it does |
//! |----------|------|-------------|
//! | Turn | [`TurnContext`] | Everything one inbound activity's processing can see and do |
//! | Delivery | [`SendActivitiesHook`], [`UpdateActivityHook`], [`DeleteActivityHook`] | Interception of outbound traffic |
//! | Transport | [`ChannelAdapter`] | The innermost send/update/delete primitives |
//! | Agent | [`Bot`] | The terminal callback at the center of the middleware chain |
//! | State | [`Storage`] | Versioned key/value persistence shared across turns |
//!
//! ## Ownership
//!
//! A [`TurnContext`] belongs to exactly one turn. Handlers receive it by
//! shared reference; every field that changes during the turn (the outbound
//! log, the `responded` flag, turn services, hook registries) sits behind
//! interior mutability so a concurrently polled background unit, such as a
//! typing indicator, can deliver activities through the same context.
//!
//! ## Futures
//!
//! Protocol traits with plain signatures use `async-trait`. Traits that
//! receive a continuation (`*Next`) return a [`BoxFuture`] directly so the
//! continuation's lifetime can be named.

#![deny(missing_docs)]

pub mod activity;
pub mod adapter;
pub mod bot;
pub mod context;
pub mod delivery;
pub mod duration;
pub mod error;
pub mod services;
pub mod storage;

#[cfg(feature = "test-utils")]
pub mod test_utils;

use std::future::Future;
use std::pin::Pin;

/// A boxed, `Send` future borrowed for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-exports for convenience
pub use activity::{
    Activity, ActivityKind, ChannelAccount, ConversationAccount, ConversationReference,
    ResourceResponse,
};
pub use adapter::ChannelAdapter;
pub use bot::{Bot, bot_fn};
pub use context::{TurnContext, TurnStatus};
pub use delivery::{
    DeleteActivityHook, DeleteNext, SendActivitiesHook, SendNext, UpdateActivityHook, UpdateNext,
    delete_hook_fn, send_hook_fn, update_hook_fn,
};
pub use duration::DurationMs;
pub use error::{DeliveryError, ETagConflict, StorageError, TurnError, ValidationError};
pub use services::TurnServices;
pub use storage::{ETAG_ANY, Storage, StoreItem, StoreItems};
