use parley_adapter::*;
use parley_core::test_utils::{EchoBot, RecordingAdapter, inbound_message};
use parley_core::*;
use parley_middleware::{ShowTypingMiddleware, TracingMiddleware, middleware_fn};
use parley_state::{StateSettings, StateSlot, TurnState};
use parley_state_memory::MemoryStorage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn adapter(config: AdapterConfig) -> (Arc<RecordingAdapter>, TurnAdapter) {
    let channel = Arc::new(RecordingAdapter::new());
    let adapter = TurnAdapter::new(channel.clone(), config).unwrap();
    (channel, adapter)
}

fn sleepy_bot(ms: u64) -> impl Bot {
    bot_fn(move |ctx| {
        Box::pin(async move {
            ctx.delay(Duration::from_millis(ms)).await?;
            ctx.send_text("woke").await?;
            Ok(())
        })
    })
}

// --- Configuration ---

#[test]
fn zero_timeout_is_rejected() {
    let config = AdapterConfig {
        turn_timeout: Some(DurationMs::ZERO),
    };
    let err = TurnAdapter::new(Arc::new(RecordingAdapter::new()), config).unwrap_err();
    assert!(err.to_string().contains("turn_timeout"));
}

#[test]
fn config_deserializes_from_millis() {
    let config: AdapterConfig =
        serde_json::from_value(serde_json::json!({"turn_timeout": 15000})).unwrap();
    assert_eq!(config.turn_timeout, Some(DurationMs::from_millis(15000)));

    let config: AdapterConfig = serde_json::from_value(serde_json::json!({})).unwrap();
    assert_eq!(config, AdapterConfig::default());
}

// --- Turns ---

#[tokio::test]
async fn echo_turn_reports_what_was_sent() {
    let (channel, mut adapter) = adapter(AdapterConfig::default());
    adapter
        .use_middleware(TracingMiddleware::new())
        .use_middleware(ShowTypingMiddleware::default());

    let report = adapter
        .process_activity(inbound_message("hello"), &EchoBot)
        .await
        .unwrap();

    assert_eq!(report.activity_id.as_deref(), Some("1234"));
    assert_eq!(report.status, TurnStatus::Completed);
    assert!(report.responded);
    assert_eq!(report.sent.len(), 1);
    assert_eq!(report.sent[0].text(), "ECHO:hello");
    assert_eq!(report.sent[0].reply_to_id.as_deref(), Some("1234"));
    assert_eq!(channel.sent_texts(), vec!["ECHO:hello"]);
}

#[tokio::test]
async fn activity_without_conversation_is_rejected_before_the_chain() {
    let (channel, mut adapter) = adapter(AdapterConfig::default());
    adapter.use_middleware(middleware_fn(|ctx, next| {
        Box::pin(async move {
            ctx.send_text("should not run").await?;
            next.run(ctx).await
        })
    }));

    let activity = Activity {
        conversation: ConversationAccount::default(),
        ..inbound_message("hello")
    };
    let err = adapter.process_activity(activity, &EchoBot).await.unwrap_err();

    assert!(matches!(err, TurnError::Validation(_)));
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn escaped_error_is_returned() {
    let (_, adapter) = adapter(AdapterConfig::default());
    let bot = bot_fn(|_ctx| Box::pin(async { Err(TurnError::fault("bot failed")) }));

    let err = adapter
        .process_activity(inbound_message("hello"), &bot)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "bot failed");
}

#[tokio::test(start_paused = true)]
async fn deadline_cancels_the_turn() {
    let (channel, adapter) = adapter(AdapterConfig {
        turn_timeout: Some(DurationMs::from_millis(100)),
    });

    let err = adapter
        .process_activity(inbound_message("hello"), &sleepy_bot(10_000))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(channel.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn turn_within_deadline_completes() {
    let (channel, adapter) = adapter(AdapterConfig {
        turn_timeout: Some(DurationMs::from_millis(1000)),
    });

    let report = adapter
        .process_activity(inbound_message("hello"), &sleepy_bot(10))
        .await
        .unwrap();

    assert_eq!(report.status, TurnStatus::Completed);
    assert_eq!(channel.sent_texts(), vec!["woke"]);
}

#[tokio::test(start_paused = true)]
async fn caller_token_cancels_the_turn() {
    let (_, adapter) = adapter(AdapterConfig::default());
    let token = CancellationToken::new();

    let cancel = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    };
    let bot = sleepy_bot(10_000);
    let (result, ()) = tokio::join!(
        adapter.process_activity_with_cancellation(inbound_message("hello"), &bot, token.clone()),
        cancel
    );

    assert!(result.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn continue_conversation_targets_the_reference() {
    let (channel, adapter) = adapter(AdapterConfig::default());
    let reference = inbound_message("earlier").conversation_reference();

    let bot = bot_fn(|ctx| {
        Box::pin(async move {
            let activity = ctx.activity();
            assert_eq!(activity.kind, ActivityKind::Event);
            assert_eq!(activity.name.as_deref(), Some(CONTINUE_CONVERSATION));
            ctx.send_text("proactive").await?;
            Ok(())
        })
    });
    let report = adapter.continue_conversation(&reference, &bot).await.unwrap();

    assert!(report.responded);
    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text(), "proactive");
    assert_eq!(sent[0].conversation.id, "convo1");
    assert_eq!(sent[0].recipient.id, "user");
    assert_eq!(sent[0].from.id, "bot");
}

#[tokio::test]
async fn process_many_runs_every_turn() {
    let (channel, mut adapter) = adapter(AdapterConfig::default());
    adapter.use_middleware(TracingMiddleware::new());

    let activities = ["a", "b", "c"]
        .into_iter()
        .map(|text| Activity {
            id: Some(format!("id-{text}")),
            ..inbound_message(text)
        })
        .collect();
    let results = adapter.process_many(activities, Arc::new(EchoBot)).await;

    let ids: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().activity_id.unwrap())
        .collect();
    assert_eq!(ids, vec!["id-a", "id-b", "id-c"]);

    let mut texts = channel.sent_texts();
    texts.sort();
    assert_eq!(texts, vec!["ECHO:a", "ECHO:b", "ECHO:c"]);
}

// --- With state ---

#[derive(Debug, Default, Serialize, Deserialize)]
struct Visits {
    count: u32,
}

#[tokio::test]
async fn conversation_state_persists_across_turns() {
    let storage = Arc::new(MemoryStorage::new());
    let (channel, mut adapter) = adapter(AdapterConfig::default());
    adapter.use_middleware(
        TurnState::<Visits>::conversation(storage, "visits", StateSettings::default()).unwrap(),
    );

    let bot = bot_fn(|ctx| {
        Box::pin(async move {
            let visits = ctx.services().require::<StateSlot<Visits>>("visits")?;
            let count = {
                let mut entry = visits.lock().await;
                entry.value.count += 1;
                entry.value.count
            };
            ctx.send_text(format!("visit {count}")).await?;
            Ok(())
        })
    });

    for _ in 0..3 {
        adapter
            .process_activity(inbound_message("hi"), &bot)
            .await
            .unwrap();
    }
    assert_eq!(channel.sent_texts(), vec!["visit 1", "visit 2", "visit 3"]);
}
