//! In-memory doubles for testing.
//!
//! Available behind the `test-utils` feature flag. These are minimal
//! implementations that prove the protocol traits are usable.

mod echo_bot;
mod recording_adapter;

pub use echo_bot::EchoBot;
pub use recording_adapter::{RecordingAdapter, inbound_message};
