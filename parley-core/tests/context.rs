//! TurnContext tests — responded flag, delivery hooks, services, status.
//! Run with: cargo test -p parley-core --features test-utils

#![cfg(feature = "test-utils")]

use parley_core::test_utils::{RecordingAdapter, inbound_message};
use parley_core::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn context() -> (Arc<RecordingAdapter>, TurnContext) {
    let adapter = Arc::new(RecordingAdapter::new());
    let ctx = TurnContext::new(adapter.clone(), inbound_message("hello"));
    (adapter, ctx)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Construction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn new_context_has_not_responded() {
    let (_, ctx) = context();
    assert!(!ctx.responded());
    assert_eq!(ctx.status(), TurnStatus::Created);
    assert!(ctx.sent_activities().is_empty());
}

#[test]
fn inbound_activity_is_exposed() {
    let (_, ctx) = context();
    assert_eq!(ctx.activity().id.as_deref(), Some("1234"));
    assert_eq!(ctx.activity().text(), "hello");
}

#[test]
fn status_follows_lifecycle() {
    let (_, ctx) = context();
    assert!(ctx.transition(TurnStatus::Completed).is_err());
    ctx.transition(TurnStatus::Running).unwrap();
    ctx.transition(TurnStatus::Faulted).unwrap();
    assert!(ctx.transition(TurnStatus::Running).is_err());
    assert_eq!(ctx.status(), TurnStatus::Faulted);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sending and the responded flag
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn send_sets_responded() {
    let (adapter, ctx) = context();
    let response = ctx
        .send_activity(Activity {
            id: Some("testtest".into()),
            ..Activity::message("hi")
        })
        .await
        .unwrap()
        .unwrap();
    assert!(ctx.responded());
    assert_eq!(response.id, "testtest");
    assert_eq!(adapter.sent_texts(), vec!["hi"]);
}

#[tokio::test]
async fn send_batch_returns_response_per_activity() {
    let (_, ctx) = context();
    let batch = vec![
        Activity {
            id: Some("message1".into()),
            ..Activity::message("one")
        },
        Activity {
            id: Some("message2".into()),
            ..Activity::message("two")
        },
    ];
    let responses = ctx.send_activities(batch).await.unwrap();
    assert!(ctx.responded());
    let ids: Vec<_> = responses.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["message1", "message2"]);
}

#[tokio::test]
async fn traces_do_not_set_responded() {
    let (_, ctx) = context();
    ctx.trace_activity("trace", None, None, None).await.unwrap();
    assert!(!ctx.responded());
    assert_eq!(ctx.sent_activities().len(), 1);

    ctx.send_text("real reply").await.unwrap();
    assert!(ctx.responded());
}

#[tokio::test]
async fn outbound_is_addressed_to_inbound_conversation() {
    let (adapter, ctx) = context();
    ctx.send_text("reply").await.unwrap();
    let sent = adapter.sent();
    assert_eq!(sent[0].conversation.id, "convo1");
    assert_eq!(sent[0].recipient.id, "user");
    assert_eq!(sent[0].from.id, "bot");
    assert_eq!(sent[0].reply_to_id.as_deref(), Some("1234"));
}

#[tokio::test]
async fn transport_failure_leaves_responded_unset() {
    let ctx = TurnContext::new(Arc::new(RecordingAdapter::failing()), inbound_message("x"));
    let err = ctx.send_text("reply").await.unwrap_err();
    assert!(matches!(err, TurnError::Delivery(DeliveryError::Transport(_))));
    assert!(!ctx.responded());
}

#[tokio::test]
async fn cancelled_turn_does_not_deliver() {
    let (adapter, ctx) = context();
    ctx.cancellation_token().cancel();
    let err = ctx.send_text("late").await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(adapter.sent().is_empty());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Send hooks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn send_hook_sees_batch_before_delivery() {
    let (_, ctx) = context();
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    ctx.on_send_activities(send_hook_fn(move |ctx, activities, next| {
        let seen = seen.clone();
        Box::pin(async move {
            seen.store(activities.len(), Ordering::SeqCst);
            next.run(ctx, activities).await
        })
    }));
    ctx.send_text("one").await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn send_hook_can_short_circuit() {
    let (adapter, ctx) = context();
    ctx.on_send_activities(send_hook_fn(|_ctx, _activities, _next| {
        // Don't call next — short-circuit
        Box::pin(async { Ok(Vec::new()) })
    }));
    let response = ctx.send_text("blocked").await.unwrap();
    assert!(response.is_none());
    assert!(adapter.sent().is_empty());
    assert!(!ctx.responded());
}

#[tokio::test]
async fn send_hook_can_mutate_batch() {
    let (adapter, ctx) = context();
    ctx.on_send_activities(send_hook_fn(|ctx, mut activities, next| {
        Box::pin(async move {
            activities[0].id = Some("changed".into());
            next.run(ctx, activities).await
        })
    }));
    ctx.send_activity(Activity {
        id: Some("1234".into()),
        ..Activity::message("x")
    })
    .await
    .unwrap();
    assert_eq!(adapter.sent()[0].id.as_deref(), Some("changed"));
}

#[tokio::test]
async fn send_hook_can_filter_batch() {
    let (adapter, ctx) = context();
    ctx.on_send_activities(send_hook_fn(|ctx, mut activities, next| {
        Box::pin(async move {
            activities.retain(|a| a.text() != "drop me");
            next.run(ctx, activities).await
        })
    }));
    let batch = vec![Activity::message("keep"), Activity::message("drop me")];
    let responses = ctx.send_activities(batch).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(adapter.sent_texts(), vec!["keep"]);
}

#[tokio::test]
async fn send_hooks_run_in_registration_order() {
    let (_, ctx) = context();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let order = order.clone();
        ctx.on_send_activities(send_hook_fn(move |ctx, activities, next| {
            let order = order.clone();
            Box::pin(async move {
                order.lock().unwrap().push(name);
                next.run(ctx, activities).await
            })
        }));
    }
    ctx.send_text("x").await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn send_hook_error_propagates_to_caller() {
    let (adapter, ctx) = context();
    ctx.on_send_activities(send_hook_fn(|_ctx, _activities, _next| {
        Box::pin(async { Err(TurnError::fault("hook exploded")) })
    }));
    let err = ctx.send_text("x").await.unwrap_err();
    assert_eq!(err.to_string(), "hook exploded");
    assert!(adapter.sent().is_empty());
}

#[tokio::test]
async fn hook_registered_mid_delivery_does_not_join_inflight_call() {
    let (_, ctx) = context();
    let late_calls = Arc::new(AtomicUsize::new(0));
    let late = late_calls.clone();
    ctx.on_send_activities(send_hook_fn(move |ctx, activities, next| {
        let late = late.clone();
        Box::pin(async move {
            let late_inner = late.clone();
            ctx.on_send_activities(send_hook_fn(move |ctx, activities, next| {
                let late = late_inner.clone();
                Box::pin(async move {
                    late.fetch_add(1, Ordering::SeqCst);
                    next.run(ctx, activities).await
                })
            }));
            next.run(ctx, activities).await
        })
    }));

    ctx.send_text("first").await.unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    // The hook added during the first call is part of the next chain.
    ctx.send_text("second").await.unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Update and delete hooks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn update_reaches_adapter() {
    let (adapter, ctx) = context();
    let result = ctx
        .update_activity(Activity {
            id: Some("test".into()),
            ..Activity::message("edited")
        })
        .await
        .unwrap();
    assert_eq!(result.unwrap().id, "test");
    assert_eq!(adapter.updated()[0].id.as_deref(), Some("test"));
}

#[tokio::test]
async fn update_hook_can_short_circuit() {
    let (adapter, ctx) = context();
    ctx.on_update_activity(update_hook_fn(|_ctx, _activity, _next| {
        Box::pin(async { Ok(None) })
    }));
    let result = ctx.update_activity(Activity::message("x")).await.unwrap();
    assert!(result.is_none());
    assert!(adapter.updated().is_empty());
}

#[tokio::test]
async fn update_hook_can_mutate() {
    let (adapter, ctx) = context();
    ctx.on_update_activity(update_hook_fn(|ctx, mut activity, next| {
        Box::pin(async move {
            activity.id = Some("mutated".into());
            next.run(ctx, activity).await
        })
    }));
    ctx.update_activity(Activity {
        id: Some("1234".into()),
        ..Activity::message("x")
    })
    .await
    .unwrap();
    assert_eq!(adapter.updated()[0].id.as_deref(), Some("mutated"));
}

#[tokio::test]
async fn delete_by_id_targets_conversation() {
    let (adapter, ctx) = context();
    ctx.delete_activity("12345").await.unwrap();
    let deleted = adapter.deleted();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].activity_id.as_deref(), Some("12345"));
    assert_eq!(deleted[0].conversation.id, "convo1");
}

#[tokio::test]
async fn delete_hook_can_short_circuit() {
    let (adapter, ctx) = context();
    let called = Arc::new(AtomicUsize::new(0));
    let seen = called.clone();
    ctx.on_delete_activity(delete_hook_fn(move |_ctx, reference, _next| {
        let seen = seen.clone();
        Box::pin(async move {
            assert_eq!(reference.activity_id.as_deref(), Some("12345"));
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }));
    ctx.delete_activity("12345").await.unwrap();
    assert_eq!(called.load(Ordering::SeqCst), 1);
    assert!(adapter.deleted().is_empty());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Services and cancellation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn services_cache_values_by_name() {
    let (_, ctx) = context();
    ctx.services().insert("bar", String::from("foo"));
    let value = ctx.services().require::<String>("bar").unwrap();
    assert_eq!(*value, "foo");
}

#[tokio::test]
async fn delay_fails_once_cancelled() {
    let (_, ctx) = context();
    let token = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });
    let err = ctx.delay(Duration::from_secs(30)).await.unwrap_err();
    assert!(matches!(err, TurnError::Cancelled));
}

#[tokio::test]
async fn delay_completes_when_not_cancelled() {
    let (_, ctx) = context();
    ctx.delay(Duration::from_millis(1)).await.unwrap();
}
