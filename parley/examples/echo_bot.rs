//! Example: an echo bot with typing, tracing and conversation state.
//!
//! Replays a short scripted conversation through a console transport that
//! prints every outbound activity. Set `RUST_LOG=debug` to see the
//! pipeline's tracing events on stderr.
//!
//! Run with: `cargo run --example echo_bot -p parley --features full`

use async_trait::async_trait;
use parley::prelude::*;
use parley::parley_core::{ChannelAccount, ConversationAccount};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// --- Console transport: prints instead of calling a channel API ---

#[derive(Default)]
struct Console {
    next_id: AtomicU64,
}

#[async_trait]
impl ChannelAdapter for Console {
    async fn send_activities(
        &self,
        _ctx: &TurnContext,
        activities: &[Activity],
    ) -> Result<Vec<ResourceResponse>, DeliveryError> {
        let mut responses = Vec::with_capacity(activities.len());
        for activity in activities {
            match activity.kind {
                ActivityKind::Typing => println!("  [{} is typing…]", activity.from.id),
                _ => println!("  {}: {}", activity.from.id, activity.text()),
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            responses.push(ResourceResponse::new(format!("out-{id}")));
        }
        Ok(responses)
    }

    async fn update_activity(
        &self,
        _ctx: &TurnContext,
        activity: &Activity,
    ) -> Result<ResourceResponse, DeliveryError> {
        println!("  (edited) {}", activity.text());
        Ok(ResourceResponse::new(activity.id.clone().unwrap_or_default()))
    }

    async fn delete_activity(
        &self,
        _ctx: &TurnContext,
        reference: &ConversationReference,
    ) -> Result<(), DeliveryError> {
        println!("  (deleted {:?})", reference.activity_id);
        Ok(())
    }
}

// --- The bot ---

#[derive(Debug, Default, Serialize, Deserialize)]
struct Conversation {
    turns: u32,
}

fn echo_bot() -> impl Bot {
    bot_fn(|ctx| {
        Box::pin(async move {
            let text = ctx.activity().text().to_string();
            if text == "slow" {
                // Long enough for the typing indicator to show.
                ctx.delay(Duration::from_millis(1200)).await?;
            }

            let state = ctx
                .services()
                .require::<StateSlot<Conversation>>("conversation")?;
            let turns = {
                let mut entry = state.lock().await;
                entry.value.turns += 1;
                entry.value.turns
            };
            ctx.send_text(format!("ECHO:{text} (turn {turns})")).await?;
            Ok(())
        })
    })
}

fn user_says(text: &str) -> Activity {
    Activity {
        id: Some(format!("in-{text}")),
        channel_id: "console".into(),
        from: ChannelAccount::new("user"),
        recipient: ChannelAccount::new("bot"),
        conversation: ConversationAccount::new("demo"),
        ..Activity::message(text)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let storage = Arc::new(MemoryStorage::new());
    let mut adapter = TurnAdapter::new(
        Arc::new(Console::default()),
        AdapterConfig {
            turn_timeout: Some(DurationMs::from_secs(5)),
        },
    )?;
    adapter
        .use_middleware(TracingMiddleware::new())
        .use_middleware(ShowTypingMiddleware::new(
            Duration::from_millis(300),
            Duration::from_millis(1000),
        )?)
        .use_middleware(TurnState::<Conversation>::conversation(
            storage,
            "conversation",
            StateSettings::default(),
        )?);

    let bot = echo_bot();
    for text in ["hello", "slow", "bye"] {
        println!("user: {text}");
        let report = adapter.process_activity(user_says(text), &bot).await?;
        println!("  -> {:?}, {} sent", report.status, report.sent.len());
    }
    Ok(())
}
