//! RecordingAdapter — a ChannelAdapter that keeps everything it is asked to
//! deliver.

use crate::activity::{
    Activity, ChannelAccount, ConversationAccount, ConversationReference, ResourceResponse,
};
use crate::adapter::ChannelAdapter;
use crate::context::TurnContext;
use crate::error::DeliveryError;
use async_trait::async_trait;
use std::sync::Mutex;

/// A transport that records sent, updated and deleted activities.
///
/// Sent activities without an id get a fresh UUID, which is also returned
/// in the [`ResourceResponse`]. Use [`RecordingAdapter::failing`] to make
/// every send fail with a transport error.
#[derive(Default)]
pub struct RecordingAdapter {
    sent: Mutex<Vec<Activity>>,
    updated: Mutex<Vec<Activity>>,
    deleted: Mutex<Vec<ConversationReference>>,
    fail_sends: bool,
}

impl RecordingAdapter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose sends always fail.
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    /// Every activity delivered so far.
    pub fn sent(&self) -> Vec<Activity> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts of delivered message activities, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.kind == crate::activity::ActivityKind::Message)
            .map(|a| a.text().to_string())
            .collect()
    }

    /// Every update delivered so far.
    pub fn updated(&self) -> Vec<Activity> {
        self.updated.lock().unwrap().clone()
    }

    /// Every delete delivered so far.
    pub fn deleted(&self) -> Vec<ConversationReference> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelAdapter for RecordingAdapter {
    async fn send_activities(
        &self,
        _ctx: &TurnContext,
        activities: &[Activity],
    ) -> Result<Vec<ResourceResponse>, DeliveryError> {
        if self.fail_sends {
            return Err(DeliveryError::Transport("recording adapter set to fail".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        let mut responses = Vec::with_capacity(activities.len());
        for activity in activities {
            let mut activity = activity.clone();
            let id = activity
                .id
                .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                .clone();
            responses.push(ResourceResponse::new(id));
            sent.push(activity);
        }
        Ok(responses)
    }

    async fn update_activity(
        &self,
        _ctx: &TurnContext,
        activity: &Activity,
    ) -> Result<ResourceResponse, DeliveryError> {
        self.updated.lock().unwrap().push(activity.clone());
        Ok(ResourceResponse::new(activity.id.clone().unwrap_or_default()))
    }

    async fn delete_activity(
        &self,
        _ctx: &TurnContext,
        reference: &ConversationReference,
    ) -> Result<(), DeliveryError> {
        self.deleted.lock().unwrap().push(reference.clone());
        Ok(())
    }
}

/// An inbound message from `user` to `bot` in conversation `convo1` on the
/// `test` channel.
pub fn inbound_message(text: &str) -> Activity {
    Activity {
        id: Some("1234".into()),
        channel_id: "test".into(),
        from: ChannelAccount::new("user"),
        recipient: ChannelAccount::new("bot"),
        conversation: ConversationAccount::new("convo1"),
        ..Activity::message(text)
    }
}
