#![deny(missing_docs)]
//! In-process turn driver for parley.
//!
//! [`TurnAdapter`] sits between a transport and the middleware chain: for
//! every inbound activity it builds a [`TurnContext`] over the transport's
//! [`ChannelAdapter`], runs the registered middleware around the bot, and
//! reports what the turn did. It owns the turn deadline: when
//! [`AdapterConfig::turn_timeout`] elapses, the turn's cancellation token is
//! triggered and the chain is left to wind down cooperatively.
//!
//! Concurrent turns use `tokio::spawn`. Nothing is retried.

use parley_core::{
    Activity, ActivityKind, Bot, ChannelAdapter, ConversationReference, DurationMs, TurnContext,
    TurnError, TurnStatus, ValidationError,
};
use parley_middleware::{Middleware, MiddlewareSet};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Event name of the activity a proactive turn starts from.
pub const CONTINUE_CONVERSATION: &str = "continueConversation";

/// Adapter configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Deadline for one turn. `None` lets turns run until they finish or
    /// their caller cancels them.
    pub turn_timeout: Option<DurationMs>,
}

/// What one turn did.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Id of the inbound activity.
    pub activity_id: Option<String>,
    /// Final lifecycle status.
    pub status: TurnStatus,
    /// Whether a non-trace activity was delivered.
    pub responded: bool,
    /// Every activity delivered, in order.
    pub sent: Vec<Activity>,
}

impl TurnReport {
    fn from_context(ctx: &TurnContext) -> Self {
        Self {
            activity_id: ctx.activity().id.clone(),
            status: ctx.status(),
            responded: ctx.responded(),
            sent: ctx.sent_activities(),
        }
    }
}

/// Drives turns through a middleware chain over one transport.
///
/// Cloning is cheap; clones share the transport and the registered
/// middleware.
#[derive(Clone)]
pub struct TurnAdapter {
    channel: Arc<dyn ChannelAdapter>,
    middleware: MiddlewareSet,
    config: AdapterConfig,
}

impl TurnAdapter {
    /// Create an adapter delivering through `channel`.
    ///
    /// A zero `turn_timeout` is rejected.
    pub fn new(channel: Arc<dyn ChannelAdapter>, config: AdapterConfig) -> Result<Self, ValidationError> {
        if config.turn_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ValidationError::new("turn_timeout must be greater than zero"));
        }
        Ok(Self {
            channel,
            middleware: MiddlewareSet::new(),
            config,
        })
    }

    /// Add middleware to the end of the chain.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.use_middleware(middleware);
        self
    }

    /// The adapter's configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// The registered middleware.
    pub fn middleware(&self) -> &MiddlewareSet {
        &self.middleware
    }

    /// Run one turn for `activity`.
    pub async fn process_activity(&self, activity: Activity, bot: &dyn Bot) -> Result<TurnReport, TurnError> {
        self.process_activity_with_cancellation(activity, bot, CancellationToken::new())
            .await
    }

    /// Run one turn for `activity`, cancelled when `token` is.
    ///
    /// The activity must name a conversation. An error that escapes the
    /// chain is returned as is; a turn cut off by the deadline or by
    /// `token` typically ends in [`TurnError::Cancelled`].
    pub async fn process_activity_with_cancellation(
        &self,
        activity: Activity,
        bot: &dyn Bot,
        token: CancellationToken,
    ) -> Result<TurnReport, TurnError> {
        if activity.conversation.id.is_empty() {
            tracing::debug!(activity_id = ?activity.id, "parley.adapter.rejected");
            return Err(ValidationError::new("activity has no conversation id").into());
        }

        let ctx = TurnContext::new(Arc::clone(&self.channel), activity).with_cancellation(token);
        self.run_turn(&ctx, bot).await?;
        Ok(TurnReport::from_context(&ctx))
    }

    /// Start a proactive turn in the conversation `reference` points at.
    ///
    /// The bot sees an `event` activity named [`CONTINUE_CONVERSATION`]
    /// from the referenced user; replies go to the referenced conversation.
    pub async fn continue_conversation(
        &self,
        reference: &ConversationReference,
        bot: &dyn Bot,
    ) -> Result<TurnReport, TurnError> {
        let mut activity = Activity {
            kind: ActivityKind::Event,
            name: Some(CONTINUE_CONVERSATION.to_owned()),
            ..Activity::default()
        };
        activity.apply_conversation_reference(reference, true);
        self.process_activity(activity, bot).await
    }

    /// Run several turns concurrently, one task each. Results are in input
    /// order.
    pub async fn process_many(
        &self,
        activities: Vec<Activity>,
        bot: Arc<dyn Bot>,
    ) -> Vec<Result<TurnReport, TurnError>> {
        let mut handles = Vec::with_capacity(activities.len());
        for activity in activities {
            let adapter = self.clone();
            let bot = Arc::clone(&bot);
            handles.push(tokio::spawn(async move {
                adapter.process_activity(activity, bot.as_ref()).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(Err(TurnError::fault(e))),
            }
        }
        results
    }

    async fn run_turn(&self, ctx: &TurnContext, bot: &dyn Bot) -> Result<(), TurnError> {
        let run = self.middleware.run(ctx, bot);
        let Some(limit) = self.config.turn_timeout else {
            return run.await;
        };

        tokio::pin!(run);
        tokio::select! {
            result = &mut run => return result,
            () = tokio::time::sleep(limit.to_std()) => {}
        }

        // Deadline reached: signal the chain and wait for it to unwind.
        tracing::debug!(
            timeout_ms = limit.as_millis(),
            activity_id = ?ctx.activity().id,
            "parley.turn.deadline"
        );
        ctx.cancellation_token().cancel();
        run.await
    }
}

impl std::fmt::Debug for TurnAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnAdapter")
            .field("middleware", &self.middleware.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
