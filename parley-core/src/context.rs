//! The per-turn aggregate.

use crate::activity::{Activity, ConversationReference, ResourceResponse};
use crate::adapter::ChannelAdapter;
use crate::delivery::{
    DeleteActivityHook, DeleteNext, SendActivitiesHook, SendNext, UpdateActivityHook, UpdateNext,
};
use crate::error::{DeliveryError, TurnError, ValidationError};
use crate::services::TurnServices;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where a turn is in its lifecycle.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The context exists but no chain has run.
    Created,
    /// The middleware chain is executing.
    Running,
    /// The chain unwound without an uncaught error.
    Completed,
    /// An error escaped the outermost handler.
    Faulted,
}

impl TurnStatus {
    /// Whether a turn in this status may move to `to`.
    pub fn can_transition_to(self, to: TurnStatus) -> bool {
        matches!(
            (self, to),
            (Self::Created, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Faulted)
        )
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn snapshot<T: ?Sized>(hooks: &RwLock<Vec<Arc<T>>>) -> Vec<Arc<T>> {
    hooks.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn append<T: ?Sized>(hooks: &RwLock<Vec<Arc<T>>>, hook: Arc<T>) {
    hooks
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(hook);
}

/// Everything one turn can see and do.
///
/// Owned by a single turn and dropped when it ends. Handlers share it by
/// reference; mutable parts use interior mutability and no lock is ever
/// held across an await point.
pub struct TurnContext {
    adapter: Arc<dyn ChannelAdapter>,
    activity: Activity,
    cancellation: CancellationToken,
    services: TurnServices,
    responded: AtomicBool,
    sent: Mutex<Vec<Activity>>,
    status: Mutex<TurnStatus>,
    send_hooks: RwLock<Vec<Arc<dyn SendActivitiesHook>>>,
    update_hooks: RwLock<Vec<Arc<dyn UpdateActivityHook>>>,
    delete_hooks: RwLock<Vec<Arc<dyn DeleteActivityHook>>>,
}

impl TurnContext {
    /// Create a context for `activity`, delivering through `adapter`.
    pub fn new(adapter: Arc<dyn ChannelAdapter>, activity: Activity) -> Self {
        Self {
            adapter,
            activity,
            cancellation: CancellationToken::new(),
            services: TurnServices::new(),
            responded: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            status: Mutex::new(TurnStatus::Created),
            send_hooks: RwLock::new(Vec::new()),
            update_hooks: RwLock::new(Vec::new()),
            delete_hooks: RwLock::new(Vec::new()),
        }
    }

    /// Use `token` as this turn's cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The inbound activity.
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// The transport this context delivers through.
    pub fn adapter(&self) -> &Arc<dyn ChannelAdapter> {
        &self.adapter
    }

    /// The turn's cancellation signal.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the turn has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Named values shared between the turn's handlers.
    pub fn services(&self) -> &TurnServices {
        &self.services
    }

    /// Whether a non-trace activity has been delivered this turn.
    pub fn responded(&self) -> bool {
        self.responded.load(Ordering::SeqCst)
    }

    /// Every activity delivered so far, in delivery order.
    pub fn sent_activities(&self) -> Vec<Activity> {
        lock(&self.sent).clone()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> TurnStatus {
        *lock(&self.status)
    }

    /// Move the turn to `to`.
    ///
    /// Only Created → Running → Completed | Faulted is allowed.
    pub fn transition(&self, to: TurnStatus) -> Result<(), ValidationError> {
        let mut status = lock(&self.status);
        if !status.can_transition_to(to) {
            return Err(ValidationError::new(format!(
                "turn cannot move from {:?} to {to:?}",
                *status
            )));
        }
        *status = to;
        Ok(())
    }

    /// Sleep for `duration`, failing with [`TurnError::Cancelled`] if the
    /// turn is cancelled first.
    pub async fn delay(&self, duration: Duration) -> Result<(), TurnError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(TurnError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    // ── Hook registration ──────────────────────────────────────

    /// Append a hook to the send chain.
    pub fn on_send_activities(&self, hook: impl SendActivitiesHook + 'static) -> &Self {
        append(&self.send_hooks, Arc::new(hook) as Arc<dyn SendActivitiesHook>);
        self
    }

    /// Append a hook to the update chain.
    pub fn on_update_activity(&self, hook: impl UpdateActivityHook + 'static) -> &Self {
        append(&self.update_hooks, Arc::new(hook) as Arc<dyn UpdateActivityHook>);
        self
    }

    /// Append a hook to the delete chain.
    pub fn on_delete_activity(&self, hook: impl DeleteActivityHook + 'static) -> &Self {
        append(&self.delete_hooks, Arc::new(hook) as Arc<dyn DeleteActivityHook>);
        self
    }

    // ── Outbound ───────────────────────────────────────────────

    /// Send a message with the given text.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<Option<ResourceResponse>, TurnError> {
        self.send_activity(Activity::message(text)).await
    }

    /// Send one activity. Returns `None` if a hook short-circuited delivery
    /// without producing a response.
    pub async fn send_activity(&self, activity: Activity) -> Result<Option<ResourceResponse>, TurnError> {
        let mut responses = self.send_activities(vec![activity]).await?;
        Ok(if responses.is_empty() {
            None
        } else {
            Some(responses.swap_remove(0))
        })
    }

    /// Send a batch through the send hook chain.
    ///
    /// Each activity is addressed to the inbound conversation first. The
    /// chain is built from the hooks registered at the moment of the call.
    pub async fn send_activities(&self, activities: Vec<Activity>) -> Result<Vec<ResourceResponse>, TurnError> {
        let reference = self.activity.conversation_reference();
        let activities = activities
            .into_iter()
            .map(|mut activity| {
                activity.apply_conversation_reference(&reference, false);
                activity
            })
            .collect();
        let hooks = snapshot(&self.send_hooks);
        SendNext::new(&hooks).run(self, activities).await
    }

    /// Replace a previously sent activity through the update hook chain.
    pub async fn update_activity(&self, mut activity: Activity) -> Result<Option<ResourceResponse>, TurnError> {
        activity.apply_conversation_reference(&self.activity.conversation_reference(), false);
        let hooks = snapshot(&self.update_hooks);
        UpdateNext::new(&hooks).run(self, activity).await
    }

    /// Delete a previously sent activity in this conversation.
    pub async fn delete_activity(&self, activity_id: impl Into<String>) -> Result<(), TurnError> {
        let mut reference = self.activity.conversation_reference();
        reference.activity_id = Some(activity_id.into());
        self.delete_conversation_reference(reference).await
    }

    /// Delete the activity `reference` points at, through the delete hook
    /// chain.
    pub async fn delete_conversation_reference(&self, reference: ConversationReference) -> Result<(), TurnError> {
        let hooks = snapshot(&self.delete_hooks);
        DeleteNext::new(&hooks).run(self, reference).await
    }

    /// Send a trace activity. Traces never mark the turn as responded.
    pub async fn trace_activity(
        &self,
        name: impl Into<String>,
        value: Option<serde_json::Value>,
        value_type: Option<String>,
        label: Option<String>,
    ) -> Result<Option<ResourceResponse>, TurnError> {
        let trace = self.activity.create_trace(name, value, value_type, label);
        self.send_activity(trace).await
    }

    // ── Innermost delivery, called at the end of each hook chain ──

    pub(crate) async fn deliver_activities(
        &self,
        activities: Vec<Activity>,
    ) -> Result<Vec<ResourceResponse>, TurnError> {
        if activities.is_empty() {
            return Ok(Vec::new());
        }
        if self.is_cancelled() {
            return Err(DeliveryError::Cancelled.into());
        }
        let responses = self.adapter.send_activities(self, &activities).await?;
        let is_response = activities.iter().any(|a| !a.is_trace());
        lock(&self.sent).extend(activities);
        if is_response {
            self.responded.store(true, Ordering::SeqCst);
        }
        Ok(responses)
    }

    pub(crate) async fn deliver_update(&self, activity: Activity) -> Result<ResourceResponse, TurnError> {
        if self.is_cancelled() {
            return Err(DeliveryError::Cancelled.into());
        }
        Ok(self.adapter.update_activity(self, &activity).await?)
    }

    pub(crate) async fn deliver_delete(&self, reference: ConversationReference) -> Result<(), TurnError> {
        if self.is_cancelled() {
            return Err(DeliveryError::Cancelled.into());
        }
        Ok(self.adapter.delete_activity(self, &reference).await?)
    }
}

impl std::fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("activity_id", &self.activity.id)
            .field("status", &self.status())
            .field("responded", &self.responded())
            .finish_non_exhaustive()
    }
}
