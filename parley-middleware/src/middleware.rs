//! Middleware types for the turn pipeline.
//!
//! Each middleware receives a `Next` it can run to continue the turn, or
//! drop to short-circuit it. Closures work through [`middleware_fn`], in the
//! style of axum's `from_fn`.

use parley_core::{Bot, BoxFuture, TurnContext, TurnError};
use std::sync::Arc;

/// A handler in a turn's middleware chain.
///
/// Each middleware receives the turn context and a [`Next`] to continue the
/// chain. Middleware can:
/// - Act on the context before passing control on
/// - Short-circuit by returning without calling `next.run()`
/// - Act again after the rest of the chain returns, or observe its error
///
/// Uses boxed futures for dyn-compatibility (heterogeneous middleware collections).
pub trait Middleware: Send + Sync {
    /// Process a turn, optionally delegating to the next middleware/bot.
    fn on_turn<'a>(
        &'a self,
        ctx: &'a TurnContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), TurnError>>;
}

/// What runs once the middleware slice is exhausted.
pub(crate) enum Tail<'a> {
    /// The bot at the center of the chain.
    Bot(&'a dyn Bot),
    /// The continuation of an enclosing chain (nested sets).
    Outer(Box<Next<'a>>),
    /// Nothing; the chain simply returns.
    End,
}

/// The remaining middleware chain plus whatever sits at its center.
///
/// Consumed on call to prevent double-invoke.
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    tail: Tail<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(middleware: &'a [Arc<dyn Middleware>], tail: Tail<'a>) -> Self {
        Self { middleware, tail }
    }

    /// Continue the middleware chain, eventually calling the bot.
    pub fn run(self, ctx: &'a TurnContext) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            if let Some((head, rest)) = self.middleware.split_first() {
                head.on_turn(ctx, Next::new(rest, self.tail)).await
            } else {
                match self.tail {
                    Tail::Bot(bot) => bot.on_turn(ctx).await,
                    Tail::Outer(next) => next.run(ctx).await,
                    Tail::End => Ok(()),
                }
            }
        })
    }
}

/// Wrapper that implements `Middleware` for a closure returning a boxed future.
struct MiddlewareFn<F> {
    f: F,
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a TurnContext, Next<'a>) -> BoxFuture<'a, Result<(), TurnError>>
        + Send
        + Sync,
{
    fn on_turn<'a>(
        &'a self,
        ctx: &'a TurnContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        (self.f)(ctx, next)
    }
}

/// Create middleware from a closure (like axum's `from_fn`).
///
/// The closure must return a `Box::pin(async move { ... })` future.
///
/// # Example
///
/// ```ignore
/// use parley_middleware::*;
///
/// let bracketing = middleware_fn(|ctx, next| {
///     Box::pin(async move {
///         ctx.send_text("BEFORE").await?;
///         next.run(ctx).await?;
///         ctx.send_text("AFTER").await?;
///         Ok(())
///     })
/// });
/// ```
#[must_use]
pub fn middleware_fn<F>(f: F) -> impl Middleware
where
    F: for<'a> Fn(&'a TurnContext, Next<'a>) -> BoxFuture<'a, Result<(), TurnError>>
        + Send
        + Sync,
{
    MiddlewareFn { f }
}
