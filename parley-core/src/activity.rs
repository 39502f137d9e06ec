//! Activities — the unit of traffic in and out of a turn.
//!
//! Only the fields the turn pipeline itself reads are modeled; channel
//! specific payloads ride in [`Activity::value`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What an activity represents.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    /// A user-facing message.
    #[default]
    Message,
    /// A "working on it" indicator.
    Typing,
    /// Members joined or left the conversation.
    ConversationUpdate,
    /// Diagnostic output for transcripts and emulators. Never counts as a
    /// response.
    Trace,
    /// A named programmatic event (proactive turns use this).
    Event,
    /// The conversation ended.
    EndOfConversation,
}

/// A participant on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAccount {
    /// Channel-specific account id.
    pub id: String,
    /// Display name, when the channel provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    /// Create an account with an id and no display name.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    /// Channel-specific conversation id.
    pub id: String,
    /// Whether the conversation has more than two participants.
    #[serde(default)]
    pub is_group: bool,
}

impl ConversationAccount {
    /// Create a one-to-one conversation account.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_group: false,
        }
    }
}

/// Enough information to address a conversation again later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReference {
    /// The activity this reference was taken from (or targets, for deletes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    /// The user side of the conversation.
    pub user: ChannelAccount,
    /// The bot side of the conversation.
    pub bot: ChannelAccount,
    /// The conversation itself.
    pub conversation: ConversationAccount,
    /// Channel identifier.
    pub channel_id: String,
    /// Where the channel expects replies, if it routes by URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
}

/// The transport's acknowledgement of a sent or updated activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResponse {
    /// Id assigned to the activity by the channel.
    pub id: String,
}

impl ResourceResponse {
    /// Create a response for the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One inbound event or outbound response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique id; outbound activities get theirs from the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// What the activity represents.
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// When the activity was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Channel identifier.
    #[serde(default)]
    pub channel_id: String,
    /// Sender.
    #[serde(default)]
    pub from: ChannelAccount,
    /// Receiver.
    #[serde(default)]
    pub recipient: ChannelAccount,
    /// Conversation the activity belongs to.
    #[serde(default)]
    pub conversation: ConversationAccount,
    /// Id of the activity this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    /// Message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Free-form payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Name of an event or trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Descriptive label of a trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Schema hint for `value` on traces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// The conversation this activity is about, when it is not the one it
    /// is sent on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relates_to: Option<ConversationReference>,
}

impl Activity {
    /// A message activity carrying `text`.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            kind: ActivityKind::Message,
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A typing indicator.
    pub fn typing() -> Self {
        Self {
            kind: ActivityKind::Typing,
            ..Self::default()
        }
    }

    /// A trace activity named `name`.
    pub fn trace(name: impl Into<String>, value: Option<serde_json::Value>) -> Self {
        Self {
            kind: ActivityKind::Trace,
            name: Some(name.into()),
            value,
            ..Self::default()
        }
    }

    /// Whether this is a trace activity.
    pub fn is_trace(&self) -> bool {
        self.kind == ActivityKind::Trace
    }

    /// The message text, or `""`.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// A message replying to this activity: sender and recipient swapped,
    /// same channel and conversation.
    pub fn create_reply(&self, text: impl Into<String>) -> Activity {
        Activity {
            kind: ActivityKind::Message,
            timestamp: Some(Utc::now()),
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            reply_to_id: self.id.clone(),
            text: Some(text.into()),
            ..Activity::default()
        }
    }

    /// A trace activity addressed like a reply to this activity.
    pub fn create_trace(
        &self,
        name: impl Into<String>,
        value: Option<serde_json::Value>,
        value_type: Option<String>,
        label: Option<String>,
    ) -> Activity {
        Activity {
            kind: ActivityKind::Trace,
            timestamp: Some(Utc::now()),
            channel_id: self.channel_id.clone(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            reply_to_id: self.id.clone(),
            name: Some(name.into()),
            value,
            value_type,
            label,
            ..Activity::default()
        }
    }

    /// The reference needed to address this activity's conversation later.
    pub fn conversation_reference(&self) -> ConversationReference {
        ConversationReference {
            activity_id: self.id.clone(),
            user: self.from.clone(),
            bot: self.recipient.clone(),
            conversation: self.conversation.clone(),
            channel_id: self.channel_id.clone(),
            service_url: None,
        }
    }

    /// Address this activity using `reference`.
    ///
    /// With `incoming` the activity is treated as coming from the user; an
    /// outgoing activity goes from the bot to the user and replies to the
    /// reference's activity.
    pub fn apply_conversation_reference(&mut self, reference: &ConversationReference, incoming: bool) {
        self.channel_id = reference.channel_id.clone();
        self.conversation = reference.conversation.clone();
        if incoming {
            self.from = reference.user.clone();
            self.recipient = reference.bot.clone();
            if reference.activity_id.is_some() {
                self.id = reference.activity_id.clone();
            }
        } else {
            self.from = reference.bot.clone();
            self.recipient = reference.user.clone();
            if reference.activity_id.is_some() {
                self.reply_to_id = reference.activity_id.clone();
            }
        }
    }
}
