//! The ordered middleware collection that drives a turn.

use crate::middleware::{Middleware, Next, Tail};
use parley_core::{Bot, BoxFuture, TurnContext, TurnError, TurnStatus};
use std::sync::Arc;
use std::time::Instant;

/// An ordered pipeline of middleware wrapped around a bot.
///
/// Middleware runs in the order it was added. A set is itself
/// [`Middleware`], so sets nest: an inner set runs its handlers and then
/// continues into the enclosing chain.
#[derive(Default, Clone)]
pub struct MiddlewareSet {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add middleware to the end of the pipeline.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Add already shared middleware to the end of the pipeline.
    pub fn use_arc(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Number of registered middleware.
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Whether no middleware is registered.
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run one turn: every middleware in order, then `bot`.
    ///
    /// Moves the context to `Running`, then to `Completed` if the chain
    /// unwinds cleanly or `Faulted` if an error escapes the outermost
    /// handler. The escaped error is returned unchanged.
    pub async fn run(&self, ctx: &TurnContext, bot: &dyn Bot) -> Result<(), TurnError> {
        self.drive(ctx, Tail::Bot(bot)).await
    }

    /// Run the middleware without a bot at the center.
    pub async fn run_chain(&self, ctx: &TurnContext) -> Result<(), TurnError> {
        self.drive(ctx, Tail::End).await
    }

    async fn drive<'a>(&'a self, ctx: &'a TurnContext, tail: Tail<'a>) -> Result<(), TurnError> {
        ctx.transition(TurnStatus::Running)?;
        let started = Instant::now();
        tracing::debug!(
            middleware = self.middleware.len(),
            activity_id = ?ctx.activity().id,
            "parley.turn.start"
        );

        let result = Next::new(&self.middleware, tail).run(ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => {
                ctx.transition(TurnStatus::Completed)?;
                tracing::debug!(elapsed_ms, responded = ctx.responded(), "parley.turn.completed");
            }
            Err(e) => {
                ctx.transition(TurnStatus::Faulted)?;
                if e.is_cancelled() {
                    tracing::debug!(elapsed_ms, "parley.turn.cancelled");
                } else {
                    tracing::error!(elapsed_ms, error = %e, "parley.turn.faulted");
                }
            }
        }
        result
    }
}

impl Middleware for MiddlewareSet {
    fn on_turn<'a>(
        &'a self,
        ctx: &'a TurnContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Next::new(&self.middleware, Tail::Outer(Box::new(next))).run(ctx)
    }
}
