//! Error types for each protocol boundary.

use std::fmt;
use thiserror::Error;

/// Malformed construction arguments or a mistyped lookup.
///
/// Raised at construction time (missing names, zero periods, invalid
/// timeouts) and by typed accessors that find a value of the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error: {0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    /// Create a validation error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One key whose version tag did not match the store's current tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETagConflict {
    /// The key that conflicted.
    pub key: String,
    /// The tag the caller supplied (`None` means "new record expected").
    pub provided: Option<String>,
    /// The tag the store currently holds for the key.
    pub current: String,
}

impl fmt::Display for ETagConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (provided {}, current {})",
            self.key,
            self.provided.as_deref().unwrap_or("<none>"),
            self.current
        )
    }
}

/// Storage errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    /// One or more keys failed optimistic concurrency checks.
    /// Nothing in the batch was written.
    #[error("etag conflict: {}", format_conflicts(.0))]
    Conflict(Vec<ETagConflict>),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The turn was cancelled before the operation completed.
    #[error("cancelled")]
    Cancelled,

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

fn format_conflicts(conflicts: &[ETagConflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Errors raised by the transport's send/update/delete primitives.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport rejected or failed to deliver the activity.
    #[error("transport error: {0}")]
    Transport(String),

    /// The turn was cancelled before delivery.
    #[error("cancelled")]
    Cancelled,

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors that unwind through a turn's middleware chain.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TurnError {
    /// Invalid arguments or mistyped turn services.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A storage call failed; conflicts surface here unmodified.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// An outbound delivery failed.
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Cooperative cancellation observed at a suspension point.
    #[error("cancelled")]
    Cancelled,

    /// An uncaught failure raised by a handler or the bot.
    #[error("{0}")]
    Fault(Box<dyn std::error::Error + Send + Sync>),
}

impl TurnError {
    /// Wrap an arbitrary handler failure.
    pub fn fault(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Fault(err.into())
    }

    /// Whether this error is a cancellation, at any layer.
    ///
    /// Cancellation is a normal way for a turn to end and should not be
    /// reported as an application error.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled
                | Self::Storage(StorageError::Cancelled)
                | Self::Delivery(DeliveryError::Cancelled)
        )
    }

    /// Whether this error is a storage version-tag conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Conflict(_)))
    }
}
