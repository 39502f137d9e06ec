//! Composition integration tests.
//!
//! A full stack: tracing, typing, conversation state and a custom handler
//! around one bot, driven by the adapter.

use parley::parley_core::test_utils::{RecordingAdapter, inbound_message};
use parley::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Transcript {
    lines: Vec<String>,
}

/// Remembers every message and replies with how many it has seen.
fn transcript_bot() -> impl Bot {
    bot_fn(|ctx| {
        Box::pin(async move {
            let slot = ctx
                .services()
                .require::<StateSlot<Transcript>>("transcript")?;
            let seen = {
                let mut entry = slot.lock().await;
                entry.value.lines.push(ctx.activity().text().to_string());
                entry.value.lines.len()
            };
            ctx.send_text(format!("seen {seen}")).await?;
            Ok(())
        })
    })
}

fn stack(storage: Arc<MemoryStorage>) -> (Arc<RecordingAdapter>, TurnAdapter) {
    let channel = Arc::new(RecordingAdapter::new());
    let mut adapter = TurnAdapter::new(channel.clone(), AdapterConfig::default()).unwrap();
    adapter
        .use_middleware(TracingMiddleware::new())
        .use_middleware(ShowTypingMiddleware::default())
        .use_middleware(
            TurnState::<Transcript>::conversation(storage, "transcript", StateSettings::default())
                .unwrap(),
        )
        .use_middleware(middleware_fn(|ctx, next| {
            Box::pin(async move {
                if ctx.activity().text() == "secret" {
                    ctx.send_text("not telling").await?;
                    return Ok(());
                }
                next.run(ctx).await
            })
        }));
    (channel, adapter)
}

#[tokio::test]
async fn full_stack_round_trip() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let storage = Arc::new(MemoryStorage::new());
    let (channel, adapter) = stack(storage.clone());

    for text in ["hello", "secret", "again"] {
        let report = adapter
            .process_activity(inbound_message(text), &transcript_bot())
            .await
            .unwrap();
        assert_eq!(report.status, TurnStatus::Completed);
        assert!(report.responded);
    }

    assert_eq!(channel.sent_texts(), vec!["seen 1", "not telling", "seen 2"]);

    let stored = storage
        .read(&["test/conversations/convo1"])
        .await
        .unwrap();
    assert_eq!(
        stored["test/conversations/convo1"].value,
        serde_json::json!({"lines": ["hello", "again"]})
    );
}

#[tokio::test]
async fn separate_conversations_keep_separate_state() {
    let storage = Arc::new(MemoryStorage::new());
    let (channel, adapter) = stack(storage);

    for conversation in ["a", "b", "a"] {
        let activity = Activity {
            conversation: parley::parley_core::ConversationAccount::new(conversation),
            ..inbound_message("hi")
        };
        adapter
            .process_activity(activity, &transcript_bot())
            .await
            .unwrap();
    }

    assert_eq!(channel.sent_texts(), vec!["seen 1", "seen 1", "seen 2"]);
}
