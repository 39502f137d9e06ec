//! Typing indicator shown while a turn is being handled.
//!
//! When the inbound activity is a message, [`ShowTypingMiddleware`] sends a
//! typing activity after an initial delay and then once per period, until
//! the rest of the chain returns. The indicator runs concurrently with the
//! chain on the same task and is stopped before the middleware returns, so
//! it can never fire after the turn has finished. A typing send still in
//! flight at that point is abandoned. Cancelling the turn stops
//! it too.

use crate::middleware::{Middleware, Next};
use parley_core::{
    Activity, ActivityKind, BoxFuture, DurationMs, TurnContext, TurnError, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Timing for [`ShowTypingMiddleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingSettings {
    /// Wait before the first indicator.
    pub delay: DurationMs,
    /// Interval between indicators. Must be non-zero.
    pub period: DurationMs,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            delay: DurationMs::from_millis(500),
            period: DurationMs::from_millis(2000),
        }
    }
}

/// Sends periodic typing activities while the rest of the chain runs.
#[derive(Debug, Clone)]
pub struct ShowTypingMiddleware {
    delay: Duration,
    period: Duration,
}

impl ShowTypingMiddleware {
    /// Create with an initial `delay` and a repeat `period`.
    ///
    /// Fails if `period` is zero.
    pub fn new(delay: Duration, period: Duration) -> Result<Self, ValidationError> {
        if period.is_zero() {
            return Err(ValidationError::new("typing period must be greater than zero"));
        }
        Ok(Self { delay, period })
    }

    /// Create from settings.
    pub fn from_settings(settings: &TypingSettings) -> Result<Self, ValidationError> {
        Self::new(settings.delay.to_std(), settings.period.to_std())
    }
}

impl Default for ShowTypingMiddleware {
    fn default() -> Self {
        let settings = TypingSettings::default();
        Self {
            delay: settings.delay.to_std(),
            period: settings.period.to_std(),
        }
    }
}

impl Middleware for ShowTypingMiddleware {
    fn on_turn<'a>(
        &'a self,
        ctx: &'a TurnContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            if ctx.activity().kind != ActivityKind::Message {
                return next.run(ctx).await;
            }

            // Child of the turn token: turn cancellation stops the indicator.
            let stop = ctx.cancellation_token().child_token();
            let indicator = show_typing(ctx, self.delay, self.period, stop.clone());
            let turn = async {
                let result = next.run(ctx).await;
                stop.cancel();
                result
            };

            let (result, ()) = tokio::join!(turn, indicator);
            result
        })
    }
}

async fn show_typing(ctx: &TurnContext, delay: Duration, period: Duration, stop: CancellationToken) {
    tracing::trace!(delay_ms = delay.as_millis() as u64, "parley.typing.start");
    tokio::select! {
        biased;
        _ = stop.cancelled() => {
            tracing::trace!("parley.typing.stop");
            return;
        }
        _ = tokio::time::sleep(delay) => {}
    }

    loop {
        let typing = Activity {
            relates_to: ctx.activity().relates_to.clone(),
            ..Activity::typing()
        };
        // A send still in flight when the turn ends is dropped undelivered.
        // Failures stay inside the indicator; the turn carries on.
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            result = ctx.send_activity(typing) => {
                if let Err(e) = result {
                    tracing::debug!(error = %e, "parley.typing.failed");
                }
            }
        }

        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }
    }
    tracing::trace!("parley.typing.stop");
}
