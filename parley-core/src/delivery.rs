//! Delivery hooks for outbound send, update and delete calls.
//!
//! Each hook receives the turn context, the outbound payload and a
//! continuation. A hook can:
//! - Inspect or rewrite the payload before forwarding it
//! - Short-circuit by returning without calling `next.run()`
//! - Inspect or rewrite the result after delivery
//!
//! The innermost step of every chain is the context's [`ChannelAdapter`].
//! Errors propagate to whoever called the context's delivery method.
//!
//! [`ChannelAdapter`]: crate::adapter::ChannelAdapter

use crate::BoxFuture;
use crate::activity::{Activity, ConversationReference, ResourceResponse};
use crate::context::TurnContext;
use crate::error::TurnError;
use std::sync::Arc;

/// Intercepts batches of outbound activities.
pub trait SendActivitiesHook: Send + Sync {
    /// Process a batch, optionally delegating to the rest of the chain.
    fn on_send<'a>(
        &'a self,
        ctx: &'a TurnContext,
        activities: Vec<Activity>,
        next: SendNext<'a>,
    ) -> BoxFuture<'a, Result<Vec<ResourceResponse>, TurnError>>;
}

/// Intercepts updates of previously sent activities.
pub trait UpdateActivityHook: Send + Sync {
    /// Process an update, optionally delegating to the rest of the chain.
    fn on_update<'a>(
        &'a self,
        ctx: &'a TurnContext,
        activity: Activity,
        next: UpdateNext<'a>,
    ) -> BoxFuture<'a, Result<Option<ResourceResponse>, TurnError>>;
}

/// Intercepts deletes of previously sent activities.
pub trait DeleteActivityHook: Send + Sync {
    /// Process a delete, optionally delegating to the rest of the chain.
    fn on_delete<'a>(
        &'a self,
        ctx: &'a TurnContext,
        reference: ConversationReference,
        next: DeleteNext<'a>,
    ) -> BoxFuture<'a, Result<(), TurnError>>;
}

/// The remaining send hooks plus the transport.
///
/// Consumed on call to prevent double delivery.
pub struct SendNext<'a> {
    hooks: &'a [Arc<dyn SendActivitiesHook>],
}

impl<'a> SendNext<'a> {
    pub(crate) fn new(hooks: &'a [Arc<dyn SendActivitiesHook>]) -> Self {
        Self { hooks }
    }

    /// Continue the chain, eventually delivering through the transport.
    pub async fn run(
        self,
        ctx: &'a TurnContext,
        activities: Vec<Activity>,
    ) -> Result<Vec<ResourceResponse>, TurnError> {
        if let Some((head, tail)) = self.hooks.split_first() {
            head.on_send(ctx, activities, SendNext::new(tail)).await
        } else {
            ctx.deliver_activities(activities).await
        }
    }
}

/// The remaining update hooks plus the transport.
pub struct UpdateNext<'a> {
    hooks: &'a [Arc<dyn UpdateActivityHook>],
}

impl<'a> UpdateNext<'a> {
    pub(crate) fn new(hooks: &'a [Arc<dyn UpdateActivityHook>]) -> Self {
        Self { hooks }
    }

    /// Continue the chain, eventually updating through the transport.
    pub async fn run(
        self,
        ctx: &'a TurnContext,
        activity: Activity,
    ) -> Result<Option<ResourceResponse>, TurnError> {
        if let Some((head, tail)) = self.hooks.split_first() {
            head.on_update(ctx, activity, UpdateNext::new(tail)).await
        } else {
            ctx.deliver_update(activity).await.map(Some)
        }
    }
}

/// The remaining delete hooks plus the transport.
pub struct DeleteNext<'a> {
    hooks: &'a [Arc<dyn DeleteActivityHook>],
}

impl<'a> DeleteNext<'a> {
    pub(crate) fn new(hooks: &'a [Arc<dyn DeleteActivityHook>]) -> Self {
        Self { hooks }
    }

    /// Continue the chain, eventually deleting through the transport.
    pub async fn run(
        self,
        ctx: &'a TurnContext,
        reference: ConversationReference,
    ) -> Result<(), TurnError> {
        if let Some((head, tail)) = self.hooks.split_first() {
            head.on_delete(ctx, reference, DeleteNext::new(tail)).await
        } else {
            ctx.deliver_delete(reference).await
        }
    }
}

struct SendHookFn<F> {
    f: F,
}

impl<F> SendActivitiesHook for SendHookFn<F>
where
    F: for<'a> Fn(
            &'a TurnContext,
            Vec<Activity>,
            SendNext<'a>,
        ) -> BoxFuture<'a, Result<Vec<ResourceResponse>, TurnError>>
        + Send
        + Sync,
{
    fn on_send<'a>(
        &'a self,
        ctx: &'a TurnContext,
        activities: Vec<Activity>,
        next: SendNext<'a>,
    ) -> BoxFuture<'a, Result<Vec<ResourceResponse>, TurnError>> {
        (self.f)(ctx, activities, next)
    }
}

struct UpdateHookFn<F> {
    f: F,
}

impl<F> UpdateActivityHook for UpdateHookFn<F>
where
    F: for<'a> Fn(
            &'a TurnContext,
            Activity,
            UpdateNext<'a>,
        ) -> BoxFuture<'a, Result<Option<ResourceResponse>, TurnError>>
        + Send
        + Sync,
{
    fn on_update<'a>(
        &'a self,
        ctx: &'a TurnContext,
        activity: Activity,
        next: UpdateNext<'a>,
    ) -> BoxFuture<'a, Result<Option<ResourceResponse>, TurnError>> {
        (self.f)(ctx, activity, next)
    }
}

struct DeleteHookFn<F> {
    f: F,
}

impl<F> DeleteActivityHook for DeleteHookFn<F>
where
    F: for<'a> Fn(
            &'a TurnContext,
            ConversationReference,
            DeleteNext<'a>,
        ) -> BoxFuture<'a, Result<(), TurnError>>
        + Send
        + Sync,
{
    fn on_delete<'a>(
        &'a self,
        ctx: &'a TurnContext,
        reference: ConversationReference,
        next: DeleteNext<'a>,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        (self.f)(ctx, reference, next)
    }
}

/// Create a send hook from a closure.
///
/// # Example
///
/// ```ignore
/// ctx.on_send_activities(send_hook_fn(|ctx, mut activities, next| {
///     Box::pin(async move {
///         activities.retain(|a| !a.is_trace());
///         next.run(ctx, activities).await
///     })
/// }));
/// ```
#[must_use]
pub fn send_hook_fn<F>(f: F) -> impl SendActivitiesHook
where
    F: for<'a> Fn(
            &'a TurnContext,
            Vec<Activity>,
            SendNext<'a>,
        ) -> BoxFuture<'a, Result<Vec<ResourceResponse>, TurnError>>
        + Send
        + Sync,
{
    SendHookFn { f }
}

/// Create an update hook from a closure.
#[must_use]
pub fn update_hook_fn<F>(f: F) -> impl UpdateActivityHook
where
    F: for<'a> Fn(
            &'a TurnContext,
            Activity,
            UpdateNext<'a>,
        ) -> BoxFuture<'a, Result<Option<ResourceResponse>, TurnError>>
        + Send
        + Sync,
{
    UpdateHookFn { f }
}

/// Create a delete hook from a closure.
#[must_use]
pub fn delete_hook_fn<F>(f: F) -> impl DeleteActivityHook
where
    F: for<'a> Fn(
            &'a TurnContext,
            ConversationReference,
            DeleteNext<'a>,
        ) -> BoxFuture<'a, Result<(), TurnError>>
        + Send
        + Sync,
{
    DeleteHookFn { f }
}
