//! [`Middleware`] that emits structured [`tracing`] events for a turn.
//!
//! Observes but never controls: the turn's outcome is returned unchanged.
//! Wire to any `tracing`-compatible subscriber.

use crate::middleware::{Middleware, Next};
use parley_core::{
    Activity, BoxFuture, ResourceResponse, SendActivitiesHook, SendNext, TurnContext, TurnError,
};
use std::time::Instant;

/// Logs the inbound activity, every outbound batch and the turn outcome.
///
/// # Levels
///
/// | Event | Level |
/// |-------|-------|
/// | `parley.turn.received`, `parley.turn.handled` | `INFO` |
/// | `parley.activity.send`, `parley.turn.cancelled` | `DEBUG` |
/// | `parley.turn.error` | `WARN` |
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMiddleware;

impl TracingMiddleware {
    /// Create a new `TracingMiddleware`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

struct SendLogger;

impl SendActivitiesHook for SendLogger {
    fn on_send<'a>(
        &'a self,
        ctx: &'a TurnContext,
        activities: Vec<Activity>,
        next: SendNext<'a>,
    ) -> BoxFuture<'a, Result<Vec<ResourceResponse>, TurnError>> {
        for activity in &activities {
            tracing::debug!(
                kind = ?activity.kind,
                conversation = %activity.conversation.id,
                reply_to = ?activity.reply_to_id,
                "parley.activity.send"
            );
        }
        Box::pin(next.run(ctx, activities))
    }
}

impl Middleware for TracingMiddleware {
    fn on_turn<'a>(
        &'a self,
        ctx: &'a TurnContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            let activity = ctx.activity();
            tracing::info!(
                kind = ?activity.kind,
                activity_id = ?activity.id,
                channel = %activity.channel_id,
                conversation = %activity.conversation.id,
                "parley.turn.received"
            );
            ctx.on_send_activities(SendLogger);

            let started = Instant::now();
            let result = next.run(ctx).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => {
                    tracing::info!(elapsed_ms, responded = ctx.responded(), "parley.turn.handled");
                }
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(elapsed_ms, "parley.turn.cancelled");
                }
                Err(e) => {
                    tracing::warn!(elapsed_ms, error = %e, "parley.turn.error");
                }
            }
            result
        })
    }
}
