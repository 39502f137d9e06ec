//! The transport boundary — the innermost send/update/delete primitives.

use crate::activity::{Activity, ConversationReference, ResourceResponse};
use crate::context::TurnContext;
use crate::error::DeliveryError;
use async_trait::async_trait;

/// A channel transport, injected into each [`TurnContext`].
///
/// These calls sit at the center of the delivery hook chains: they run only
/// when every registered hook forwarded the call. Implementations own their
/// client (HTTP, socket, test recorder) explicitly; there is no process-wide
/// default transport.
///
/// Implementations:
/// - RecordingAdapter: captures traffic in memory (`test-utils`)
/// - HTTP connectors for concrete channels (outside this workspace)
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Deliver a batch of activities, in order. Returns one response per
    /// delivered activity.
    async fn send_activities(
        &self,
        ctx: &TurnContext,
        activities: &[Activity],
    ) -> Result<Vec<ResourceResponse>, DeliveryError>;

    /// Replace a previously sent activity.
    async fn update_activity(
        &self,
        ctx: &TurnContext,
        activity: &Activity,
    ) -> Result<ResourceResponse, DeliveryError>;

    /// Delete a previously sent activity.
    async fn delete_activity(
        &self,
        ctx: &TurnContext,
        reference: &ConversationReference,
    ) -> Result<(), DeliveryError>;
}
