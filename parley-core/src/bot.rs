//! The agent boundary — the terminal callback of a middleware chain.

use crate::BoxFuture;
use crate::context::TurnContext;
use crate::error::TurnError;
use async_trait::async_trait;

/// The agent's own logic, invoked at the innermost point of the chain.
///
/// A bot reads the inbound activity from the context and produces output
/// through the context's delivery methods.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Handle one turn.
    async fn on_turn(&self, ctx: &TurnContext) -> Result<(), TurnError>;
}

/// Wrapper that implements `Bot` for a closure returning a boxed future.
struct BotFn<F> {
    f: F,
}

#[async_trait]
impl<F> Bot for BotFn<F>
where
    F: for<'a> Fn(&'a TurnContext) -> BoxFuture<'a, Result<(), TurnError>> + Send + Sync,
{
    async fn on_turn(&self, ctx: &TurnContext) -> Result<(), TurnError> {
        (self.f)(ctx).await
    }
}

/// Create a bot from a closure.
///
/// The closure must return a `Box::pin(async move { ... })` future.
///
/// # Example
///
/// ```ignore
/// let echo = bot_fn(|ctx| {
///     Box::pin(async move {
///         let reply = format!("ECHO:{}", ctx.activity().text());
///         ctx.send_text(reply).await?;
///         Ok(())
///     })
/// });
/// ```
#[must_use]
pub fn bot_fn<F>(f: F) -> impl Bot
where
    F: for<'a> Fn(&'a TurnContext) -> BoxFuture<'a, Result<(), TurnError>> + Send + Sync,
{
    BotFn { f }
}
